//! Audio Test Fixtures
//!
//! Programmatically generated PCM so tests have no external file
//! dependencies and precise control over duration and content.
//!
//! Audio format:
//! - Sample rate: 16kHz (16000 Hz)
//! - Bit depth: 16-bit signed PCM
//! - Channels: Mono

use std::f32::consts::PI;
use std::path::{Path, PathBuf};

/// Standard sample rate for recognition (16kHz)
pub const SAMPLE_RATE: u32 = 16000;

/// Samples in one second at 16kHz
pub const SECOND: usize = 16000;

/// Generate silence (zeros)
pub fn generate_silence(duration_samples: usize) -> Vec<i16> {
    vec![0i16; duration_samples]
}

/// Generate a sine wave tone
pub fn generate_sine_wave(duration_samples: usize, frequency: f32, amplitude: f32) -> Vec<i16> {
    let max_amplitude = amplitude * i16::MAX as f32;
    let angular_freq = 2.0 * PI * frequency / SAMPLE_RATE as f32;

    (0..duration_samples)
        .map(|i| ((angular_freq * i as f32).sin() * max_amplitude) as i16)
        .collect()
}

/// One tone per window of `window_secs`, stepping the frequency by 100 Hz.
///
/// Useful to tell chunks apart by content when checking segmentation.
pub fn generate_tone_per_window(total_secs: usize, window_secs: usize) -> Vec<i16> {
    let window = window_secs.max(1) * SECOND;
    let total = total_secs * SECOND;
    let mut samples = Vec::with_capacity(total);

    let mut frequency = 300.0;
    while samples.len() < total {
        let len = window.min(total - samples.len());
        samples.extend(generate_sine_wave(len, frequency, 0.4));
        frequency += 100.0;
    }
    samples
}

/// Convert i16 samples to little-endian bytes
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Write mono 16kHz samples as a WAV file.
pub fn write_wav(path: &Path, samples: &[i16]) {
    write_wav_at(path, samples, SAMPLE_RATE);
}

/// Write mono samples at `sample_rate` as a WAV file.
pub fn write_wav_at(path: &Path, samples: &[i16], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for sample in samples {
        writer.write_sample(*sample).unwrap();
    }
    writer.finalize().unwrap();
}

/// Write `secs` seconds of silence to `dir/name` and return the path.
pub fn write_silent_wav(dir: &Path, name: &str, secs: usize) -> PathBuf {
    let path = dir.join(name);
    write_wav(&path, &generate_silence(secs * SECOND));
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_per_window_length() {
        let samples = generate_tone_per_window(125, 50);
        assert_eq!(samples.len(), 125 * SECOND);
    }

    #[test]
    fn test_samples_to_bytes() {
        assert_eq!(samples_to_bytes(&[1, -1]), vec![1, 0, 0xFF, 0xFF]);
    }
}
