//! Format conversion to a backend's target profile.
//!
//! Conversion is best-effort: callers fall back to the original audio when it
//! fails. Outputs are temporary files owned by [`NormalizedAudio`] and removed
//! when it is dropped.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempPath;
use thiserror::Error;
use tracing::{debug, info};

use super::probe::AudioProfile;
use super::tool::{ToolError, run_tool};

// =============================================================================
// Constants
// =============================================================================

/// Default wall-clock budget for one conversion.
pub const DEFAULT_CONVERSION_TIMEOUT_SECS: u64 = 120;

/// Sample rate of both built-in target profiles.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Codecs the ffmpeg adapter knows how to produce.
pub const SUPPORTED_TARGET_CODECS: &[&str] = &["pcm_s16le", "aac", "flac"];

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("{tool} timed out after {seconds}s")]
    ToolTimeout { tool: String, seconds: u64 },

    #[error("{tool} failed (status {status:?}): {diagnostic}")]
    ToolFailure {
        tool: String,
        status: Option<i32>,
        diagnostic: String,
    },

    #[error("unsupported conversion target: {0}")]
    UnsupportedTarget(String),

    #[error("I/O error during conversion: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ToolError> for ConversionError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Timeout { tool, seconds } => Self::ToolTimeout { tool, seconds },
            ToolError::Spawn { tool, reason } => Self::ToolFailure {
                tool,
                status: None,
                diagnostic: reason,
            },
            ToolError::Failed {
                tool,
                status,
                diagnostic,
            } => Self::ToolFailure {
                tool,
                status,
                diagnostic,
            },
        }
    }
}

// =============================================================================
// Target Profile
// =============================================================================

/// Output format requested from the converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetProfile {
    pub sample_rate: u32,
    pub channels: u16,
    /// ffmpeg codec name, e.g. `pcm_s16le` or `aac`.
    pub codec: String,
    pub bitrate_kbps: Option<u32>,
    /// File extension of the output container, without the dot.
    pub extension: String,
    /// Media type announced to remote services for this container.
    pub mime_type: String,
}

impl TargetProfile {
    /// 16 kHz mono linear PCM in a WAV container.
    pub fn pcm_wav() -> Self {
        Self {
            sample_rate: TARGET_SAMPLE_RATE,
            channels: 1,
            codec: "pcm_s16le".to_string(),
            bitrate_kbps: None,
            extension: "wav".to_string(),
            mime_type: "audio/wav".to_string(),
        }
    }

    /// 16 kHz mono AAC at 128 kbps in an MP4 container.
    pub fn aac_m4a() -> Self {
        Self {
            sample_rate: TARGET_SAMPLE_RATE,
            channels: 1,
            codec: "aac".to_string(),
            bitrate_kbps: Some(128),
            extension: "m4a".to_string(),
            mime_type: "audio/mp4".to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ConversionError> {
        if !SUPPORTED_TARGET_CODECS.contains(&self.codec.as_str()) {
            return Err(ConversionError::UnsupportedTarget(format!(
                "codec '{}' (supported: {})",
                self.codec,
                SUPPORTED_TARGET_CODECS.join(", ")
            )));
        }
        if !(8_000..=48_000).contains(&self.sample_rate) {
            return Err(ConversionError::UnsupportedTarget(format!(
                "sample rate {} Hz",
                self.sample_rate
            )));
        }
        if !(1..=2).contains(&self.channels) {
            return Err(ConversionError::UnsupportedTarget(format!(
                "{} channels",
                self.channels
            )));
        }
        if self.extension.is_empty() {
            return Err(ConversionError::UnsupportedTarget(
                "empty container extension".to_string(),
            ));
        }
        Ok(())
    }

    /// True when `source` at `path` already matches this profile.
    pub fn is_satisfied_by(&self, source: &AudioProfile, path: &Path) -> bool {
        let same_container = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension));

        same_container
            && source.codec.eq_ignore_ascii_case(&self.codec)
            && source.sample_rate == self.sample_rate
            && source.channels == self.channels
    }

    /// ffmpeg arguments converting `input` into `output`.
    pub(crate) fn ffmpeg_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-y".into(),
            "-i".into(),
            input.as_os_str().to_owned(),
            "-ar".into(),
            self.sample_rate.to_string().into(),
            "-ac".into(),
            self.channels.to_string().into(),
            "-acodec".into(),
            self.codec.clone().into(),
        ];
        if let Some(kbps) = self.bitrate_kbps {
            args.push("-b:a".into());
            args.push(format!("{kbps}k").into());
        }
        args.push(output.as_os_str().to_owned());
        args
    }
}

// =============================================================================
// Normalized Audio
// =============================================================================

/// A converted (or copied) artifact. The file is deleted on drop.
#[derive(Debug)]
pub struct NormalizedAudio {
    path: TempPath,
    pub target: TargetProfile,
    /// False when the source already conformed and was copied as-is.
    pub converted: bool,
}

impl NormalizedAudio {
    /// Take ownership of an artifact written by a converter.
    pub fn new(path: TempPath, target: TargetProfile, converted: bool) -> Self {
        Self {
            path,
            target,
            converted,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read_bytes(&self) -> Result<Vec<u8>, ConversionError> {
        Ok(tokio::fs::read(&*self.path).await?)
    }
}

fn temp_output(target: &TargetProfile) -> Result<TempPath, ConversionError> {
    let file = tempfile::Builder::new()
        .prefix("railscribe-")
        .suffix(&format!(".{}", target.extension))
        .tempfile()?;
    Ok(file.into_temp_path())
}

// =============================================================================
// Converter
// =============================================================================

#[async_trait]
pub trait AudioConverter: Send + Sync {
    /// Produce `input` in the `target` format. Already-conforming audio is
    /// copied, never rejected.
    async fn convert(
        &self,
        input: &Path,
        source: &AudioProfile,
        target: &TargetProfile,
    ) -> Result<NormalizedAudio, ConversionError>;
}

/// Converter backed by the `ffmpeg` command line utility.
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    program: PathBuf,
    timeout: Duration,
}

impl Default for FfmpegConverter {
    fn default() -> Self {
        Self::new("ffmpeg", Duration::from_secs(DEFAULT_CONVERSION_TIMEOUT_SECS))
    }
}

impl FfmpegConverter {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl AudioConverter for FfmpegConverter {
    async fn convert(
        &self,
        input: &Path,
        source: &AudioProfile,
        target: &TargetProfile,
    ) -> Result<NormalizedAudio, ConversionError> {
        target.validate()?;
        let output = temp_output(target)?;

        if target.is_satisfied_by(source, input) {
            debug!("{} already conforms to {}, copying", input.display(), target.codec);
            tokio::fs::copy(input, &*output).await?;
            return Ok(NormalizedAudio {
                path: output,
                target: target.clone(),
                converted: false,
            });
        }

        run_tool(&self.program, target.ffmpeg_args(input, &output), self.timeout).await?;

        info!(
            "Converted {} ({} @ {} Hz) to {} @ {} Hz",
            input.display(),
            source.codec,
            source.sample_rate,
            target.codec,
            target.sample_rate
        );

        Ok(NormalizedAudio {
            path: output,
            target: target.clone(),
            converted: true,
        })
    }
}
