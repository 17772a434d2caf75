//! Decoded 16-bit PCM audio and WAV packaging.

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;

use super::probe::MediaError;

/// Interleaved 16-bit little-endian PCM held in memory.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pcm: Bytes,
    sample_rate: u32,
    channels: u16,
}

impl DecodedAudio {
    /// Wrap raw interleaved PCM. Trailing bytes that do not form a whole
    /// frame are dropped.
    pub fn from_pcm(pcm: impl Into<Bytes>, sample_rate: u32, channels: u16) -> Self {
        let mut pcm: Bytes = pcm.into();
        let frame = 2 * usize::from(channels.max(1));
        let whole = pcm.len() - pcm.len() % frame;
        pcm.truncate(whole);
        Self {
            pcm,
            sample_rate,
            channels: channels.max(1),
        }
    }

    /// Read a 16-bit integer PCM WAV file.
    ///
    /// Blocking; callers on the runtime should use `spawn_blocking`.
    pub fn from_wav_file(path: &Path) -> Result<Self, MediaError> {
        let reader = hound::WavReader::open(path)
            .map_err(|e| MediaError::unreadable(path, format!("not a readable WAV file: {e}")))?;
        let spec = reader.spec();

        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(MediaError::unreadable(
                path,
                format!(
                    "unsupported WAV encoding: {} bit {:?}",
                    spec.bits_per_sample, spec.sample_format
                ),
            ));
        }

        let mut pcm = Vec::with_capacity(reader.len() as usize * 2);
        for sample in reader.into_samples::<i16>() {
            let sample = sample
                .map_err(|e| MediaError::unreadable(path, format!("corrupt sample data: {e}")))?;
            pcm.extend_from_slice(&sample.to_le_bytes());
        }

        if pcm.is_empty() {
            return Err(MediaError::unreadable(path, "WAV file has no samples"));
        }

        Ok(Self::from_pcm(pcm, spec.sample_rate, spec.channels))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bytes_per_frame(&self) -> usize {
        2 * usize::from(self.channels)
    }

    pub fn frame_count(&self) -> usize {
        self.pcm.len() / self.bytes_per_frame()
    }

    pub fn duration(&self) -> Duration {
        frames_to_duration(self.frame_count(), self.sample_rate)
    }

    /// Zero-copy view of frames `start..end`.
    pub fn slice_frames(&self, start: usize, end: usize) -> Bytes {
        let bpf = self.bytes_per_frame();
        self.pcm.slice(start * bpf..end * bpf)
    }
}

/// Exact (nanosecond-floored) duration of `frames` at `sample_rate`.
pub fn frames_to_duration(frames: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    let nanos = frames as u128 * 1_000_000_000 / u128::from(sample_rate);
    Duration::from_nanos(nanos as u64)
}

pub mod wav {
    /// WAV header size for canonical PCM files.
    pub const HEADER_SIZE: usize = 44;

    /// Package raw 16-bit PCM into a canonical WAV container.
    pub fn create_wav(pcm_data: &[u8], sample_rate: u32, channels: u16) -> Vec<u8> {
        let bits_per_sample: u16 = 16;
        let byte_rate = sample_rate * u32::from(channels) * u32::from(bits_per_sample) / 8;
        let block_align = channels * bits_per_sample / 8;
        let data_size = pcm_data.len() as u32;

        let mut wav = Vec::with_capacity(HEADER_SIZE + pcm_data.len());

        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(36 + data_size).to_le_bytes());
        wav.extend_from_slice(b"WAVE");

        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
        wav.extend_from_slice(&channels.to_le_bytes());
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        wav.extend_from_slice(&byte_rate.to_le_bytes());
        wav.extend_from_slice(&block_align.to_le_bytes());
        wav.extend_from_slice(&bits_per_sample.to_le_bytes());

        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&data_size.to_le_bytes());
        wav.extend_from_slice(pcm_data);

        wav
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm_of(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_wav_header_layout() {
        let pcm = pcm_of(&[1, -1, 2, -2]);
        let wav = wav::create_wav(&pcm, 16_000, 1);

        assert_eq!(wav.len(), wav::HEADER_SIZE + 8);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 16_000);
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 8);
    }

    #[test]
    fn test_hound_reads_created_wav() {
        let pcm = pcm_of(&[100, -200, 300]);
        let mut file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        std::io::Write::write_all(&mut file, &wav::create_wav(&pcm, 8_000, 1)).unwrap();

        let audio = DecodedAudio::from_wav_file(file.path()).unwrap();
        assert_eq!(audio.sample_rate(), 8_000);
        assert_eq!(audio.frame_count(), 3);
        assert_eq!(&audio.slice_frames(1, 3)[..], &pcm[2..]);
    }

    #[test]
    fn test_from_wav_file_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"definitely not audio").unwrap();
        assert!(DecodedAudio::from_wav_file(file.path()).is_err());
    }

    #[test]
    fn test_partial_frame_dropped() {
        let audio = DecodedAudio::from_pcm(vec![0u8; 7], 16_000, 2);
        assert_eq!(audio.frame_count(), 1);
    }

    #[test]
    fn test_duration_exact_at_16k() {
        let audio = DecodedAudio::from_pcm(vec![0u8; 16_000 * 2 * 125], 16_000, 1);
        assert_eq!(audio.duration(), Duration::from_secs(125));
        assert_eq!(frames_to_duration(1, 16_000), Duration::from_micros(62) + Duration::from_nanos(500));
    }
}
