//! Time-bounded chunk segmentation.
//!
//! Audio is split into consecutive windows of `max_duration`; the last window
//! may be shorter. Segmentation never looks at payload size: the encoded size
//! of each chunk is checked against `max_payload_bytes` at dispatch time, and
//! an oversized chunk becomes a failed outcome instead of being truncated.
//!
//! Short audio is not special-cased. Anything that fits in one window yields
//! exactly one chunk.

use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

use super::audio::{DecodedAudio, frames_to_duration};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegmentationError {
    #[error("audio contains no frames")]
    EmptyAudio,

    #[error("invalid segment limits: {0}")]
    InvalidLimits(String),
}

/// Duration and payload ceilings of one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLimits {
    pub max_duration: Duration,
    pub max_payload_bytes: usize,
}

impl SegmentLimits {
    pub fn new(max_duration: Duration, max_payload_bytes: usize) -> Self {
        Self {
            max_duration,
            max_payload_bytes,
        }
    }

    pub fn validate(&self) -> Result<(), SegmentationError> {
        if self.max_duration.is_zero() {
            return Err(SegmentationError::InvalidLimits(
                "max duration must be positive".to_string(),
            ));
        }
        if self.max_payload_bytes == 0 {
            return Err(SegmentationError::InvalidLimits(
                "max payload bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether an encoded payload of `encoded_len` bytes may be sent.
    #[inline]
    pub fn admits(&self, encoded_len: usize) -> bool {
        encoded_len <= self.max_payload_bytes
    }
}

/// One time window of a source file, owned by exactly one backend call.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// 0-based position within the file.
    pub index: usize,
    pub start: Duration,
    pub duration: Duration,
    /// Raw interleaved 16-bit PCM for this window.
    pub payload: Bytes,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioChunk {
    #[inline]
    pub fn payload_size(&self) -> usize {
        self.payload.len()
    }

    /// 1-based position used in markers and logs.
    #[inline]
    pub fn position(&self) -> usize {
        self.index + 1
    }
}

/// Splits decoded audio according to a backend's limits.
#[derive(Debug, Clone, Copy)]
pub struct ChunkSegmenter {
    limits: SegmentLimits,
}

impl ChunkSegmenter {
    pub fn new(limits: SegmentLimits) -> Result<Self, SegmentationError> {
        limits.validate()?;
        Ok(Self { limits })
    }

    pub fn limits(&self) -> &SegmentLimits {
        &self.limits
    }

    fn window_frames(&self, sample_rate: u32) -> usize {
        let frames = (self.limits.max_duration.as_secs_f64() * f64::from(sample_rate)).round();
        (frames as usize).max(1)
    }

    /// Number of chunks `segment` will yield for `audio`.
    pub fn chunk_count(&self, audio: &DecodedAudio) -> usize {
        audio
            .frame_count()
            .div_ceil(self.window_frames(audio.sample_rate()))
    }

    /// Lazily yield the chunks of `audio`. Calling again restarts from the
    /// first window; nothing is consumed or mutated.
    pub fn segment<'a>(&self, audio: &'a DecodedAudio) -> Result<Chunks<'a>, SegmentationError> {
        let total_frames = audio.frame_count();
        if total_frames == 0 {
            return Err(SegmentationError::EmptyAudio);
        }

        Ok(Chunks {
            audio,
            window_frames: self.window_frames(audio.sample_rate()),
            next_frame: 0,
            next_index: 0,
            total_frames,
        })
    }
}

/// Iterator over the chunks of one decoded file.
#[derive(Debug)]
pub struct Chunks<'a> {
    audio: &'a DecodedAudio,
    window_frames: usize,
    next_frame: usize,
    next_index: usize,
    total_frames: usize,
}

impl Iterator for Chunks<'_> {
    type Item = AudioChunk;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_frame >= self.total_frames {
            return None;
        }

        let start = self.next_frame;
        let end = (start + self.window_frames).min(self.total_frames);
        let rate = self.audio.sample_rate();

        let chunk = AudioChunk {
            index: self.next_index,
            start: frames_to_duration(start, rate),
            duration: frames_to_duration(end - start, rate),
            payload: self.audio.slice_frames(start, end),
            sample_rate: rate,
            channels: self.audio.channels(),
        };

        self.next_frame = end;
        self.next_index += 1;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total_frames - self.next_frame).div_ceil(self.window_frames);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Chunks<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16_000;

    fn silence(seconds: f64) -> DecodedAudio {
        let frames = (seconds * f64::from(RATE)) as usize;
        DecodedAudio::from_pcm(vec![0u8; frames * 2], RATE, 1)
    }

    fn segmenter(window_secs: u64) -> ChunkSegmenter {
        ChunkSegmenter::new(SegmentLimits::new(
            Duration::from_secs(window_secs),
            8 * 1024 * 1024,
        ))
        .unwrap()
    }

    #[test]
    fn test_125s_with_50s_window() {
        let audio = silence(125.0);
        let chunks: Vec<_> = segmenter(50).segment(&audio).unwrap().collect();

        let durations: Vec<_> = chunks.iter().map(|c| c.duration).collect();
        assert_eq!(
            durations,
            vec![
                Duration::from_secs(50),
                Duration::from_secs(50),
                Duration::from_secs(25)
            ]
        );
        assert_eq!(chunks[1].start, Duration::from_secs(50));
        assert_eq!(chunks[2].start, Duration::from_secs(100));
        assert_eq!(chunks[2].payload_size(), 25 * 16_000 * 2);
        assert_eq!(chunks[2].position(), 3);
    }

    #[test]
    fn test_short_audio_yields_single_chunk() {
        for seconds in [0.5, 10.0, 49.9, 50.0] {
            let audio = silence(seconds);
            let chunks: Vec<_> = segmenter(50).segment(&audio).unwrap().collect();
            assert_eq!(chunks.len(), 1, "{seconds}s");
            assert_eq!(chunks[0].start, Duration::ZERO);
            assert_eq!(chunks[0].duration, audio.duration());
        }
    }

    #[test]
    fn test_chunk_count_is_ceiling_and_windows_tile() {
        for (total, window) in [(1u64, 1u64), (7, 3), (60, 7), (300, 50), (301, 50), (59, 60)] {
            let audio = silence(total as f64);
            let seg = segmenter(window);
            let chunks: Vec<_> = seg.segment(&audio).unwrap().collect();

            assert_eq!(chunks.len() as u64, total.div_ceil(window), "{total}/{window}");
            assert_eq!(seg.chunk_count(&audio), chunks.len());

            let sum: Duration = chunks.iter().map(|c| c.duration).sum();
            assert_eq!(sum, audio.duration());

            let mut expected_start = Duration::ZERO;
            for (i, chunk) in chunks.iter().enumerate() {
                assert_eq!(chunk.index, i);
                assert_eq!(chunk.start, expected_start);
                expected_start += chunk.duration;
            }
        }
    }

    #[test]
    fn test_segment_is_restartable() {
        let audio = silence(12.0);
        let seg = segmenter(5);
        let first: Vec<_> = seg.segment(&audio).unwrap().map(|c| c.start).collect();
        let second: Vec<_> = seg.segment(&audio).unwrap().map(|c| c.start).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_exact_size_hint() {
        let audio = silence(12.0);
        let mut chunks = segmenter(5).segment(&audio).unwrap();
        assert_eq!(chunks.len(), 3);
        chunks.next();
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_empty_audio_rejected() {
        let audio = DecodedAudio::from_pcm(Vec::<u8>::new(), RATE, 1);
        assert_eq!(
            segmenter(50).segment(&audio).unwrap_err(),
            SegmentationError::EmptyAudio
        );
    }

    #[test]
    fn test_invalid_limits_rejected() {
        assert!(ChunkSegmenter::new(SegmentLimits::new(Duration::ZERO, 10)).is_err());
        assert!(ChunkSegmenter::new(SegmentLimits::new(Duration::from_secs(1), 0)).is_err());
    }

    #[test]
    fn test_admits() {
        let limits = SegmentLimits::new(Duration::from_secs(50), 100);
        assert!(limits.admits(100));
        assert!(!limits.admits(101));
    }
}
