//! Audio handling: triage, conversion, decoding, and source identity.
//!
//! The external audio utilities are black boxes behind two traits:
//!
//! | Trait | Default implementation | Tool |
//! |-------|------------------------|------|
//! | [`AudioProber`] | [`FfprobeProber`] | `ffprobe` |
//! | [`AudioConverter`] | [`FfmpegConverter`] | `ffmpeg` |
//!
//! Both run under a wall-clock budget (10s probe, 120s conversion by default)
//! and report failures as typed errors instead of panicking on bad input.

pub mod convert;
pub mod pcm;
pub mod probe;
pub mod source;
pub mod tool;

pub use convert::{
    AudioConverter, ConversionError, DEFAULT_CONVERSION_TIMEOUT_SECS, FfmpegConverter,
    NormalizedAudio, TARGET_SAMPLE_RATE, TargetProfile,
};
pub use pcm::{DecodedAudio, frames_to_duration, wav};
pub use probe::{
    AudioProber, AudioProfile, DEFAULT_PROBE_TIMEOUT_SECS, FfprobeProber, MediaError,
    SAMPLE_RATE_FLOOR, is_telephony_codec,
};
pub use source::{SourceFile, now_local, parse_origin_timestamp};
