//! Audio quality triage.
//!
//! The probe inspects a file's first audio stream and classifies whether it
//! should be normalized before recognition. Classification is a pure
//! function of codec and sample rate; the ffprobe adapter only gathers those
//! facts.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::tool::run_tool;

// =============================================================================
// Constants
// =============================================================================

/// Sample rate below which recognition quality degrades noticeably.
pub const SAMPLE_RATE_FLOOR: u32 = 16_000;

/// Default wall-clock budget for a probe.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

/// Codecs designed for telephony or heavy compression.
///
/// Every `adpcm_*` variant is also treated as telephony-grade.
pub const TELEPHONY_CODECS: &[&str] = &[
    "pcm_mulaw",
    "pcm_alaw",
    "gsm",
    "gsm_ms",
    "g722",
    "g723_1",
    "g726",
    "g726le",
    "g729",
    "amr_nb",
];

// =============================================================================
// Errors
// =============================================================================

/// Input media that cannot be used at all. Terminal for the file.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("unreadable media '{}': {reason}", .path.display())]
    UnreadableMedia { path: PathBuf, reason: String },
}

impl MediaError {
    pub(crate) fn unreadable(path: &Path, reason: impl Into<String>) -> Self {
        Self::UnreadableMedia {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Audio Profile
// =============================================================================

/// Format facts about a source file plus the normalization verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioProfile {
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration: Duration,
    pub needs_normalization: bool,
}

/// Returns true for codecs known to degrade recognition.
pub fn is_telephony_codec(codec: &str) -> bool {
    let codec = codec.to_ascii_lowercase();
    codec.starts_with("adpcm_") || TELEPHONY_CODECS.contains(&codec.as_str())
}

impl AudioProfile {
    /// Build a profile and derive `needs_normalization`.
    pub fn classify(codec: impl Into<String>, sample_rate: u32, channels: u16, duration: Duration) -> Self {
        let codec = codec.into();
        let needs_normalization = is_telephony_codec(&codec) || sample_rate < SAMPLE_RATE_FLOOR;
        Self {
            codec,
            sample_rate,
            channels,
            duration,
            needs_normalization,
        }
    }

    /// Whether the stream is already 16-bit little-endian PCM.
    pub fn is_pcm_s16(&self) -> bool {
        self.codec.eq_ignore_ascii_case("pcm_s16le")
    }

    /// Human-readable quality notes for the presentation layer.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if is_telephony_codec(&self.codec) {
            warnings.push(format!(
                "compressed telephony codec ({}) lowers recognition accuracy",
                self.codec
            ));
        }
        if self.sample_rate < SAMPLE_RATE_FLOOR {
            warnings.push(format!(
                "sample rate {} Hz is below the recommended {} Hz",
                self.sample_rate, SAMPLE_RATE_FLOOR
            ));
        }
        warnings
    }
}

// =============================================================================
// Prober
// =============================================================================

/// Read-only inspection of an audio file.
#[async_trait]
pub trait AudioProber: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<AudioProfile, MediaError>;
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output.
pub(crate) fn parse_ffprobe_json(json: &str) -> Result<AudioProfile, String> {
    let output: FfprobeOutput =
        serde_json::from_str(json).map_err(|e| format!("invalid probe output: {e}"))?;

    let stream = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .or_else(|| output.streams.first())
        .ok_or_else(|| "no audio stream found".to_string())?;

    let codec = stream
        .codec_name
        .clone()
        .unwrap_or_else(|| "unknown".to_string());
    let sample_rate = stream
        .sample_rate
        .as_deref()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);
    let channels = stream.channels.unwrap_or(1);

    let seconds = output
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| "duration unavailable".to_string())?;

    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(format!("invalid duration {seconds}"));
    }

    Ok(AudioProfile::classify(
        codec,
        sample_rate,
        channels,
        Duration::from_secs_f64(seconds),
    ))
}

/// Prober backed by the `ffprobe` command line utility.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    program: PathBuf,
    timeout: Duration,
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new("ffprobe", Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS))
    }
}

impl FfprobeProber {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl AudioProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<AudioProfile, MediaError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| MediaError::unreadable(path, format!("file not accessible: {e}")))?;
        if !metadata.is_file() {
            return Err(MediaError::unreadable(path, "not a regular file"));
        }
        if metadata.len() == 0 {
            return Err(MediaError::unreadable(path, "file is empty"));
        }

        let args: [&OsStr; 7] = [
            OsStr::new("-v"),
            OsStr::new("quiet"),
            OsStr::new("-print_format"),
            OsStr::new("json"),
            OsStr::new("-show_format"),
            OsStr::new("-show_streams"),
            path.as_os_str(),
        ];
        let output = run_tool(&self.program, args, self.timeout)
            .await
            .map_err(|e| MediaError::unreadable(path, e.to_string()))?;

        let json = String::from_utf8_lossy(&output.stdout);
        let profile = parse_ffprobe_json(&json).map_err(|reason| MediaError::unreadable(path, reason))?;

        debug!(
            "Probed {}: codec={} rate={} channels={} duration={:?} normalize={}",
            path.display(),
            profile.codec,
            profile.sample_rate,
            profile.channels,
            profile.duration,
            profile.needs_normalization
        );

        Ok(profile)
    }
}
