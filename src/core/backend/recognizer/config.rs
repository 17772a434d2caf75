//! Configuration types for the Google Cloud Speech-to-Text recognizer.
//!
//! # Synchronous Recognition Limits
//!
//! `speech:recognize` accepts inline audio of at most one minute and roughly
//! 10MB of request body. Chunks are kept well inside both ceilings:
//!
//! | Limit | Service | Default |
//! |-------|---------|---------|
//! | Duration | 60s | 50s |
//! | Payload | 10MB | 8MiB |
//!
//! ## Models
//!
//! | Model | Use |
//! |-------|-----|
//! | `latest_long` | Long-form media and radio traffic |
//! | `latest_short` | Short commands |
//! | `phone_call` | Narrow-band telephone audio |
//! | `default` | Service default |

use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;

use zeroize::Zeroize;

use crate::config::TranscribeConfig;
use crate::core::backend::{BackendError, BackendProfile, PayloadEncoding};
use crate::utils::validate_endpoint;

// =============================================================================
// Constants
// =============================================================================

/// Synchronous recognition endpoint.
pub const RECOGNIZER_URL: &str = "https://speech.googleapis.com/v1/speech:recognize";

/// Default BCP-47 language (Mandarin, Traditional script, Taiwan).
pub const DEFAULT_LANGUAGE: &str = "cmn-Hant-TW";

/// Default chunk window in seconds.
pub const DEFAULT_MAX_CHUNK_SECS: u64 = 50;

/// Longest inline audio accepted by synchronous recognition.
pub const MAX_SYNC_DURATION_SECS: u64 = 60;

/// Default encoded payload ceiling (8MiB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 8 * 1024 * 1024;

/// Service request body limit for inline audio.
pub const MAX_SYNC_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;

/// LINEAR16 sample rates the service accepts.
pub const SUPPORTED_SAMPLE_RATES: RangeInclusive<u32> = 8_000..=48_000;

/// Most channels a single request may declare.
pub const MAX_CHANNELS: u16 = 8;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// Models
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecognizerModel {
    #[default]
    LatestLong,
    LatestShort,
    PhoneCall,
    Default,
}

impl RecognizerModel {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LatestLong => "latest_long",
            Self::LatestShort => "latest_short",
            Self::PhoneCall => "phone_call",
            Self::Default => "default",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().replace('-', "_").as_str() {
            "latest_long" | "long" => Self::LatestLong,
            "latest_short" | "short" => Self::LatestShort,
            "phone_call" | "phone" | "telephony" => Self::PhoneCall,
            "default" => Self::Default,
            _ => Self::default(),
        }
    }
}

impl fmt::Display for RecognizerModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Authentication
// =============================================================================

/// Credential sent with each request.
#[derive(Clone, PartialEq, Eq)]
pub enum RecognizerAuth {
    /// API key passed as the `key` query parameter.
    ApiKey(String),
    /// OAuth2 access token passed as a bearer token.
    BearerToken(String),
}

impl RecognizerAuth {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::ApiKey(secret) | Self::BearerToken(secret) => secret.is_empty(),
        }
    }

    pub(crate) fn zeroize_secret(&mut self) {
        match self {
            Self::ApiKey(secret) | Self::BearerToken(secret) => secret.zeroize(),
        }
    }
}

impl fmt::Debug for RecognizerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Self::BearerToken(_) => f.write_str("BearerToken(<redacted>)"),
        }
    }
}

// =============================================================================
// Recognizer Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    pub auth: RecognizerAuth,
    pub language_code: String,
    pub model: RecognizerModel,
    pub enable_automatic_punctuation: bool,
    pub max_chunk_duration: Duration,
    pub max_payload_bytes: usize,
    pub request_timeout: Duration,
    /// Custom API endpoint URL (regional endpoints, proxies, test servers).
    pub custom_endpoint: Option<String>,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            auth: RecognizerAuth::ApiKey(String::new()),
            language_code: DEFAULT_LANGUAGE.to_string(),
            model: RecognizerModel::default(),
            enable_automatic_punctuation: true,
            max_chunk_duration: Duration::from_secs(DEFAULT_MAX_CHUNK_SECS),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            custom_endpoint: None,
        }
    }
}

impl RecognizerConfig {
    /// Derive recognizer settings from application configuration.
    ///
    /// An access token takes precedence over an API key.
    pub fn from_app_config(config: &TranscribeConfig) -> Result<Self, BackendError> {
        let auth = match (&config.recognizer_access_token, &config.recognizer_api_key) {
            (Some(token), _) if !token.is_empty() => RecognizerAuth::BearerToken(token.clone()),
            (_, Some(key)) if !key.is_empty() => RecognizerAuth::ApiKey(key.clone()),
            _ => {
                return Err(BackendError::ConfigurationError(
                    "Recognizer credentials not configured (GOOGLE_SPEECH_API_KEY or GOOGLE_SPEECH_ACCESS_TOKEN)"
                        .to_string(),
                ));
            }
        };

        Ok(Self {
            auth,
            language_code: config.recognizer_language.clone(),
            model: RecognizerModel::from_str_or_default(&config.recognizer_model),
            max_chunk_duration: Duration::from_secs(config.recognizer_chunk_seconds),
            max_payload_bytes: config.recognizer_max_payload_bytes,
            request_timeout: Duration::from_secs(config.request_timeout_seconds),
            custom_endpoint: config.recognizer_endpoint.clone(),
            ..Default::default()
        })
    }

    #[inline]
    pub fn api_url(&self) -> &str {
        self.custom_endpoint.as_deref().unwrap_or(RECOGNIZER_URL)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.auth.is_empty() {
            return Err("Recognizer credential is required".to_string());
        }

        if self.language_code.trim().is_empty() {
            return Err("Language code is required".to_string());
        }

        if self.max_chunk_duration.is_zero()
            || self.max_chunk_duration > Duration::from_secs(MAX_SYNC_DURATION_SECS)
        {
            return Err(format!(
                "Chunk duration must be between 1 and {}s, got {:?}",
                MAX_SYNC_DURATION_SECS, self.max_chunk_duration
            ));
        }

        if self.max_payload_bytes == 0 || self.max_payload_bytes > MAX_SYNC_PAYLOAD_BYTES {
            return Err(format!(
                "Max payload must be between 1 and {} bytes, got {}",
                MAX_SYNC_PAYLOAD_BYTES, self.max_payload_bytes
            ));
        }

        if let Some(ref endpoint) = self.custom_endpoint {
            validate_endpoint(endpoint).map_err(|e| format!("Invalid recognizer endpoint: {e}"))?;
        }

        Ok(())
    }

    /// Reject a payload the service cannot decode as LINEAR16.
    ///
    /// The request declares the payload's own rate and channel count, which
    /// always equal its WAV header.
    pub fn check_payload(&self, sample_rate: u32, channels: u16) -> Result<(), String> {
        if !SUPPORTED_SAMPLE_RATES.contains(&sample_rate) {
            return Err(format!("Unsupported sample rate: {sample_rate}"));
        }
        if !(1..=MAX_CHANNELS).contains(&channels) {
            return Err(format!("Unsupported channel count: {channels}"));
        }
        Ok(())
    }

    /// Limits and packaging the dispatcher applies for this backend.
    pub fn profile(&self) -> BackendProfile {
        BackendProfile {
            max_chunk_duration: self.max_chunk_duration,
            max_payload_bytes: self.max_payload_bytes,
            request_timeout: self.request_timeout,
            encoding: PayloadEncoding::Wav,
        }
    }

    pub fn with_language(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = language_code.into();
        self
    }

    pub fn with_model(mut self, model: RecognizerModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.custom_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_max_chunk_duration(mut self, duration: Duration) -> Self {
        self.max_chunk_duration = duration;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
