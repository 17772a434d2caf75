//! Configuration types for the Gemini generative transcription backend.
//!
//! # Inline Audio Limits
//!
//! `generateContent` accepts audio inline in the request body (20MB total
//! request size). Chunks are packaged as AAC in an MP4 container to keep
//! long windows small; 10 minutes at 128kbps is under 10MB.
//!
//! | Limit | Service | Default |
//! |-------|---------|---------|
//! | Request body | 20MB | 15MiB payload |
//! | Chunk window | none | 600s |

use std::time::Duration;

use crate::config::TranscribeConfig;
use crate::core::audio::TargetProfile;
use crate::core::backend::{BackendError, BackendProfile, DomainHints, PayloadEncoding};
use crate::utils::validate_endpoint;

// =============================================================================
// Constants
// =============================================================================

/// Base URL for model endpoints.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Default model.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

/// Default chunk window in seconds.
pub const DEFAULT_MAX_CHUNK_SECS: u64 = 600;

/// Default inline payload ceiling (15MiB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 15 * 1024 * 1024;

/// Hard ceiling of an inline request body.
pub const MAX_INLINE_PAYLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Instruction sent ahead of every audio chunk.
pub const DEFAULT_PROMPT: &str = "Transcribe this railway operations radio recording verbatim.\n\
Rules:\n\
1. Keep domain terms exactly as spoken (for example OCC, Bypass, VVVF).\n\
2. Keep all digits and English codes.\n\
3. Output only the transcript text, with no commentary or formatting.\n\
4. Separate each exchange with 。 or a newline.\n\
5. Transcribe everything; do not summarize or omit anything.";

// =============================================================================
// Generative Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct GenerativeConfig {
    pub api_key: String,
    pub model: String,
    pub prompt: String,
    /// Sampling temperature; 0.0 keeps transcripts deterministic.
    pub temperature: Option<f32>,
    pub max_chunk_duration: Duration,
    pub max_payload_bytes: usize,
    pub request_timeout: Duration,
    /// Container each chunk is converted into before upload.
    pub target: TargetProfile,
    /// Replaces [`GEMINI_BASE_URL`] (regional endpoints, proxies, test servers).
    pub custom_endpoint: Option<String>,
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            temperature: Some(0.0),
            max_chunk_duration: Duration::from_secs(DEFAULT_MAX_CHUNK_SECS),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            target: TargetProfile::aac_m4a(),
            custom_endpoint: None,
        }
    }
}

impl GenerativeConfig {
    pub fn from_app_config(config: &TranscribeConfig) -> Result<Self, BackendError> {
        let api_key = config
            .get_api_key("generative")
            .map_err(BackendError::ConfigurationError)?;

        Ok(Self {
            api_key,
            model: config.gemini_model.clone(),
            prompt: config
                .gemini_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            max_chunk_duration: Duration::from_secs(config.generative_chunk_seconds),
            max_payload_bytes: config.generative_max_payload_bytes,
            request_timeout: Duration::from_secs(config.request_timeout_seconds),
            custom_endpoint: config.gemini_endpoint.clone(),
            ..Default::default()
        })
    }

    /// Full `generateContent` URL for the configured model.
    pub fn api_url(&self) -> String {
        let base = self
            .custom_endpoint
            .as_deref()
            .unwrap_or(GEMINI_BASE_URL)
            .trim_end_matches('/');
        format!("{}/{}:generateContent", base, self.model)
    }

    /// Prompt text with the domain vocabulary appended.
    pub fn build_prompt(&self, hints: &DomainHints) -> String {
        if hints.is_empty() {
            return self.prompt.clone();
        }
        format!(
            "{}\n\nDomain vocabulary (write these exactly as listed): {}",
            self.prompt,
            hints.phrases.join(", ")
        )
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.is_empty() {
            return Err("API key is required".to_string());
        }

        if self.model.trim().is_empty() || self.model.contains('/') {
            return Err(format!("Invalid model name: '{}'", self.model));
        }

        if self.prompt.trim().is_empty() {
            return Err("Prompt must not be empty".to_string());
        }

        if let Some(temp) = self.temperature
            && !(0.0..=2.0).contains(&temp)
        {
            return Err(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                temp
            ));
        }

        if self.max_chunk_duration.is_zero() {
            return Err("Chunk duration must be positive".to_string());
        }

        if self.max_payload_bytes == 0 || self.max_payload_bytes > MAX_INLINE_PAYLOAD_BYTES {
            return Err(format!(
                "Max payload must be between 1 and {} bytes, got {}",
                MAX_INLINE_PAYLOAD_BYTES, self.max_payload_bytes
            ));
        }

        self.target
            .validate()
            .map_err(|e| format!("Invalid chunk container: {e}"))?;

        if let Some(ref endpoint) = self.custom_endpoint {
            validate_endpoint(endpoint).map_err(|e| format!("Invalid generative endpoint: {e}"))?;
        }

        Ok(())
    }

    pub fn profile(&self) -> BackendProfile {
        BackendProfile {
            max_chunk_duration: self.max_chunk_duration,
            max_payload_bytes: self.max_payload_bytes,
            request_timeout: self.request_timeout,
            encoding: PayloadEncoding::Container(self.target.clone()),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.custom_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_target(mut self, target: TargetProfile) -> Self {
        self.target = target;
        self
    }
}
