//! Remote transcription backends.
//!
//! A backend accepts one bounded, already-encoded audio payload and returns
//! recognized text or a classified [`BackendError`]. Chunking, payload
//! encoding, size ceilings, timeouts, and cancellation are handled by the
//! dispatcher in [`crate::core::dispatch`], so implementations only deal
//! with the wire protocol.
//!
//! # Backends
//!
//! | Backend | Service | Payload | Default ceiling |
//! |---------|---------|---------|-----------------|
//! | `recognizer` | Google Cloud Speech-to-Text v1 | WAV (LINEAR16) | 50s / 8 MiB |
//! | `generative` | Gemini `generateContent` | AAC in MP4 | 600s / 15 MiB |
//!
//! # Failure kinds
//!
//! Adapters return structured errors derived from HTTP status and the
//! service's error status. Free-text sniffing of error messages is only a
//! fallback, kept inside each adapter's `classify_message`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::config::TranscribeConfig;
use crate::core::audio::TargetProfile;
use crate::core::segment::SegmentLimits;

pub mod generative;
pub mod recognizer;

pub use generative::{GenerativeBackend, GenerativeConfig};
pub use recognizer::{RecognizerAuth, RecognizerBackend, RecognizerConfig};

// =============================================================================
// Constants
// =============================================================================

/// Operational radio vocabulary used to bias recognition by default.
pub const DEFAULT_DOMAIN_PHRASES: &[&str] = &[
    "OCC",
    "行控中心",
    "呼叫",
    "軌道",
    "月台",
    "Bypass",
    "VVVF",
    "異物",
    "車門",
    "號車",
    "緊急",
    "停車",
    "淨空",
    "方形鑰匙",
];

/// Default boost applied to the domain vocabulary.
pub const DEFAULT_DOMAIN_BOOST: f32 = 15.0;

/// User-Agent header value for API requests.
pub(crate) const USER_AGENT: &str = concat!("Railscribe/", env!("CARGO_PKG_VERSION"));

/// Default connect timeout in seconds.
pub(crate) const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Backend Kind
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Recognizer,
    Generative,
}

impl BackendKind {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recognizer => "recognizer",
            Self::Generative => "generative",
        }
    }

    pub fn all() -> [BackendKind; 2] {
        [Self::Recognizer, Self::Generative]
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "recognizer" | "stt" | "google" => Ok(Self::Recognizer),
            "generative" | "gemini" => Ok(Self::Generative),
            _ => Err(BackendError::ConfigurationError(format!(
                "Unsupported backend: {s}. Supported backends: recognizer, generative"
            ))),
        }
    }
}

// =============================================================================
// Domain Hints
// =============================================================================

/// Weighted vocabulary used to bias recognition.
///
/// Backends without phrase biasing may use the phrases in other ways (the
/// generative backend lists them in its prompt) or ignore them.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainHints {
    pub phrases: Vec<String>,
    pub boost: f32,
}

impl Default for DomainHints {
    fn default() -> Self {
        Self {
            phrases: DEFAULT_DOMAIN_PHRASES.iter().map(|p| p.to_string()).collect(),
            boost: DEFAULT_DOMAIN_BOOST,
        }
    }
}

impl DomainHints {
    pub fn new(phrases: Vec<String>, boost: f32) -> Self {
        Self { phrases, boost }
    }

    pub fn none() -> Self {
        Self {
            phrases: Vec::new(),
            boost: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

// =============================================================================
// Payloads and Profiles
// =============================================================================

/// An encoded chunk ready to be sent to a service.
#[derive(Debug, Clone)]
pub struct EncodedPayload {
    pub bytes: Bytes,
    pub mime_type: String,
    pub sample_rate: u32,
    pub channels: u16,
}

impl EncodedPayload {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// How a backend wants chunk PCM packaged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadEncoding {
    /// Canonical WAV container around LINEAR16 samples.
    Wav,
    /// Compressed container produced by the audio converter.
    Container(TargetProfile),
}

/// Fixed allowance of every chunk call (connection, upload, queueing).
pub const CALL_TIMEOUT_BASE: Duration = Duration::from_secs(15);

/// Call time allowed per second of chunk audio.
pub const CALL_TIMEOUT_PER_AUDIO_SECOND: u32 = 2;

/// Limits and packaging requirements a backend declares.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendProfile {
    pub max_chunk_duration: Duration,
    pub max_payload_bytes: usize,
    /// Ceiling for a single call, whatever the chunk length.
    pub request_timeout: Duration,
    pub encoding: PayloadEncoding,
}

impl BackendProfile {
    pub fn segment_limits(&self) -> SegmentLimits {
        SegmentLimits::new(self.max_chunk_duration, self.max_payload_bytes)
    }

    /// Timeout for recognizing a chunk of `audio` length: a fixed base plus a
    /// multiple of the audio, capped at `request_timeout`.
    pub fn call_timeout(&self, audio: Duration) -> Duration {
        let expected = CALL_TIMEOUT_BASE + audio * CALL_TIMEOUT_PER_AUDIO_SECOND;
        expected.min(self.request_timeout)
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Why a chunk produced no text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    QuotaExceeded,
    InvalidAudio,
    DurationExceeded,
    UnsupportedFormat,
    ContentFiltered,
    PayloadTooLarge,
    Timeout,
    Cancelled,
    Unknown(String),
}

impl FailureKind {
    /// Short description used inside chunk markers.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::QuotaExceeded => "quota exceeded",
            Self::InvalidAudio => "invalid audio",
            Self::DurationExceeded => "audio too long",
            Self::UnsupportedFormat => "unsupported format",
            Self::ContentFiltered => "content filtered",
            Self::PayloadTooLarge => "payload too large, skipped",
            Self::Timeout => "timed out",
            Self::Cancelled => "cancelled",
            Self::Unknown(_) => "recognition failed",
        }
    }

    /// Bracketed inline marker for the chunk at 1-based `position`.
    pub fn marker(&self, position: usize) -> String {
        format!("[chunk {}: {}]", position, self.describe())
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(detail) => write!(f, "unknown failure: {detail}"),
            other => write!(f, "{}", other.describe()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkResult {
    Recognized(String),
    Failed(FailureKind),
}

/// Result of one (chunk, backend) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOutcome {
    pub index: usize,
    pub result: ChunkResult,
}

impl ChunkOutcome {
    pub fn recognized(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            result: ChunkResult::Recognized(text.into()),
        }
    }

    pub fn failed(index: usize, kind: FailureKind) -> Self {
        Self {
            index,
            result: ChunkResult::Failed(kind),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.result, ChunkResult::Failed(_))
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    #[error("Audio duration exceeded: {0}")]
    DurationExceeded(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Content filtered: {0}")]
    ContentFiltered(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

impl BackendError {
    /// Collapse into the kind recorded in a chunk outcome.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::QuotaExceeded(_) => FailureKind::QuotaExceeded,
            Self::InvalidAudio(_) => FailureKind::InvalidAudio,
            Self::DurationExceeded(_) => FailureKind::DurationExceeded,
            Self::UnsupportedFormat(_) => FailureKind::UnsupportedFormat,
            Self::ContentFiltered(_) => FailureKind::ContentFiltered,
            other => FailureKind::Unknown(other.to_string()),
        }
    }
}

// =============================================================================
// HTTP Plumbing
// =============================================================================

/// Build the pooled HTTP client shared by a backend's calls.
pub(crate) fn build_http_client(request_timeout: Duration) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .timeout(request_timeout)
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| BackendError::ConfigurationError(format!("Failed to create HTTP client: {e}")))
}

/// Diagnostic headers captured from a service response.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResponseMeta {
    pub request_id: Option<String>,
    /// Retry-After value in seconds, when the service sent one.
    pub retry_after_secs: Option<u64>,
}

impl ResponseMeta {
    pub fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        Self {
            request_id: header("x-goog-request-id").or_else(|| header("x-request-id")),
            retry_after_secs: header("retry-after").and_then(|v| v.trim().parse().ok()),
        }
    }

    /// Suffix appended to error details, e.g. ` [request_id: abc] (retry after 30s)`.
    pub fn suffix(&self) -> String {
        let mut suffix = String::new();
        if let Some(ref id) = self.request_id {
            suffix.push_str(&format!(" [request_id: {id}]"));
        }
        if let Some(secs) = self.retry_after_secs {
            suffix.push_str(&format!(" (retry after {secs}s)"));
        }
        suffix
    }
}

// =============================================================================
// Trait
// =============================================================================

/// A remote transcription service.
///
/// Implementations hold their own credentials and HTTP client, never retry,
/// and must be safe to call concurrently for different chunks.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Stable label used in transcripts and reports.
    fn name(&self) -> &'static str;

    fn profile(&self) -> &BackendProfile;

    /// Recognize one encoded chunk.
    async fn recognize(
        &self,
        chunk_index: usize,
        payload: EncodedPayload,
        hints: &DomainHints,
    ) -> Result<String, BackendError>;
}

// =============================================================================
// Factory
// =============================================================================

/// Build a backend from application configuration.
pub fn create_backend(
    kind: BackendKind,
    config: &TranscribeConfig,
) -> Result<Arc<dyn TranscriptionBackend>, BackendError> {
    match kind {
        BackendKind::Recognizer => {
            let backend = RecognizerBackend::with_config(RecognizerConfig::from_app_config(config)?)?;
            Ok(Arc::new(backend))
        }
        BackendKind::Generative => {
            let backend = GenerativeBackend::with_config(GenerativeConfig::from_app_config(config)?)?;
            Ok(Arc::new(backend))
        }
    }
}

/// Build a backend from its name, e.g. `"recognizer"` or `"gemini"`.
pub fn create_backend_by_name(
    name: &str,
    config: &TranscribeConfig,
) -> Result<Arc<dyn TranscriptionBackend>, BackendError> {
    create_backend(name.parse()?, config)
}

pub fn get_supported_backends() -> Vec<&'static str> {
    BackendKind::all().iter().map(BackendKind::as_str).collect()
}

#[cfg(test)]
mod factory_tests {
    use super::*;

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("recognizer".parse::<BackendKind>().unwrap(), BackendKind::Recognizer);
        assert_eq!("GEMINI".parse::<BackendKind>().unwrap(), BackendKind::Generative);
        assert_eq!("stt".parse::<BackendKind>().unwrap(), BackendKind::Recognizer);
        assert!("whisper".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_supported_backends() {
        assert_eq!(get_supported_backends(), vec!["recognizer", "generative"]);
    }

    #[test]
    fn test_create_backend_requires_credentials() {
        let config = TranscribeConfig::default();
        let err = create_backend(BackendKind::Generative, &config).err().unwrap();
        assert!(matches!(err, BackendError::ConfigurationError(_)));
    }

    #[test]
    fn test_create_backend_with_credentials() {
        let mut config = TranscribeConfig::default();
        config.recognizer_api_key = Some("rk".to_string());
        config.gemini_api_key = Some("gk".to_string());

        let recognizer = create_backend_by_name("recognizer", &config).unwrap();
        assert_eq!(recognizer.name(), "recognizer");
        let generative = create_backend_by_name("gemini", &config).unwrap();
        assert_eq!(generative.name(), "generative");
        assert!(generative.profile().max_payload_bytes > 0);
    }

    #[test]
    fn test_failure_markers() {
        assert_eq!(FailureKind::QuotaExceeded.marker(2), "[chunk 2: quota exceeded]");
        assert_eq!(
            FailureKind::PayloadTooLarge.marker(1),
            "[chunk 1: payload too large, skipped]"
        );
        assert_eq!(
            FailureKind::Unknown("boom".to_string()).marker(3),
            "[chunk 3: recognition failed]"
        );
    }

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(
            BackendError::QuotaExceeded("x".into()).kind(),
            FailureKind::QuotaExceeded
        );
        assert!(matches!(
            BackendError::NetworkError("reset".into()).kind(),
            FailureKind::Unknown(detail) if detail.contains("reset")
        ));
    }

    #[test]
    fn test_response_meta_suffix() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("x-request-id", "req-9".parse().unwrap());
        headers.insert("retry-after", "30".parse().unwrap());

        let meta = ResponseMeta::from_headers(&headers);
        assert_eq!(meta.request_id.as_deref(), Some("req-9"));
        assert_eq!(meta.suffix(), " [request_id: req-9] (retry after 30s)");
        assert_eq!(ResponseMeta::default().suffix(), "");
    }

    #[test]
    fn test_default_hints() {
        let hints = DomainHints::default();
        assert!(hints.phrases.iter().any(|p| p == "VVVF"));
        assert_eq!(hints.boost, 15.0);
        assert!(DomainHints::none().is_empty());
    }

    #[test]
    fn test_call_timeout_scales_with_chunk_and_is_capped() {
        let profile = BackendProfile {
            max_chunk_duration: Duration::from_secs(50),
            max_payload_bytes: 1024,
            request_timeout: Duration::from_secs(120),
            encoding: PayloadEncoding::Wav,
        };

        assert_eq!(profile.call_timeout(Duration::from_secs(5)), Duration::from_secs(25));
        assert_eq!(profile.call_timeout(Duration::from_secs(50)), Duration::from_secs(115));
        assert!(
            profile.call_timeout(Duration::from_secs(10))
                < profile.call_timeout(Duration::from_secs(40))
        );

        let capped = BackendProfile {
            request_timeout: Duration::from_secs(30),
            ..profile
        };
        assert_eq!(capped.call_timeout(Duration::from_secs(50)), Duration::from_secs(30));
    }
}
