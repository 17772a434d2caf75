//! Google Cloud Speech-to-Text recognizer client.
//!
//! Each chunk is sent to `speech:recognize` as one synchronous request with
//! inline base64 audio. The chunk is a complete WAV file; the service reads
//! the RIFF header for LINEAR16 input, and the declared `sampleRateHertz`
//! matches the header.
//!
//! # Error Mapping
//!
//! | HTTP / status | Error |
//! |---------------|-------|
//! | 429, `RESOURCE_EXHAUSTED` | `QuotaExceeded` |
//! | 400 `INVALID_ARGUMENT` mentioning duration | `DurationExceeded` |
//! | 400 `INVALID_ARGUMENT` | `InvalidAudio` |
//! | 401, 403 | `AuthenticationFailed` |
//! | 5xx | `ProviderError` |

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use tracing::{debug, warn};

use super::config::{RecognizerAuth, RecognizerConfig};
use super::messages::{
    GoogleErrorResponse, RecognitionAudio, RecognitionConfig, RecognizeRequest, RecognizeResponse,
    SpeechContext,
};
use crate::core::backend::{
    BackendError, BackendProfile, DomainHints, EncodedPayload, ResponseMeta, TranscriptionBackend,
    build_http_client,
};
use crate::utils::truncate_chars;

/// Audio encoding declared for chunk payloads.
const LINEAR16: &str = "LINEAR16";

/// Maximum characters of a raw error body kept in error details.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Synchronous Speech-to-Text recognizer.
pub struct RecognizerBackend {
    config: RecognizerConfig,
    profile: BackendProfile,
    http_client: Client,
}

impl RecognizerBackend {
    pub fn with_config(config: RecognizerConfig) -> Result<Self, BackendError> {
        config.validate().map_err(BackendError::ConfigurationError)?;

        let http_client = build_http_client(config.request_timeout)?;
        let profile = config.profile();

        Ok(Self {
            config,
            profile,
            http_client,
        })
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    pub(crate) fn build_request(&self, payload: &EncodedPayload, hints: &DomainHints) -> RecognizeRequest {
        let speech_contexts = if hints.is_empty() {
            Vec::new()
        } else {
            vec![SpeechContext {
                phrases: hints.phrases.clone(),
                boost: (hints.boost > 0.0).then_some(hints.boost),
            }]
        };

        RecognizeRequest {
            config: RecognitionConfig {
                encoding: LINEAR16.to_string(),
                sample_rate_hertz: payload.sample_rate,
                audio_channel_count: payload.channels,
                language_code: self.config.language_code.clone(),
                enable_automatic_punctuation: self.config.enable_automatic_punctuation,
                model: self.config.model.as_str().to_string(),
                speech_contexts,
            },
            audio: RecognitionAudio {
                content: BASE64.encode(&payload.bytes),
            },
        }
    }
}

impl Drop for RecognizerBackend {
    fn drop(&mut self) {
        self.config.auth.zeroize_secret();
    }
}

/// Map an error response to a structured error.
pub(crate) fn classify_error(status: u16, body: &str, meta: &ResponseMeta) -> BackendError {
    let suffix = meta.suffix();

    let Ok(parsed) = serde_json::from_str::<GoogleErrorResponse>(body) else {
        let detail = format!(
            "Recognizer API error ({}): {}{}",
            status,
            truncate_chars(body, MAX_ERROR_BODY_CHARS),
            suffix
        );
        return match status {
            429 => BackendError::QuotaExceeded(detail),
            401 | 403 => BackendError::AuthenticationFailed(detail),
            500..=599 => BackendError::ProviderError(format!("Server error: {detail}")),
            _ => classify_message(detail),
        };
    };

    let error = parsed.error;
    let detail = format!("{} ({}){}", error.message, error.status, suffix);

    match (status, error.status.as_str()) {
        (429, _) | (_, "RESOURCE_EXHAUSTED") => BackendError::QuotaExceeded(detail),
        (401, _) | (403, _) | (_, "UNAUTHENTICATED") | (_, "PERMISSION_DENIED") => {
            BackendError::AuthenticationFailed(detail)
        }
        (_, "INVALID_ARGUMENT") | (400, _) => {
            if mentions_duration(&error.message) {
                BackendError::DurationExceeded(detail)
            } else {
                BackendError::InvalidAudio(detail)
            }
        }
        (500..=599, _) => BackendError::ProviderError(format!("Server error: {detail}")),
        _ => classify_message(detail),
    }
}

fn mentions_duration(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("too long") || lower.contains("duration") || lower.contains("longrunningrecognize")
}

/// Last-resort mapping when the service gave no structured status.
pub(crate) fn classify_message(detail: String) -> BackendError {
    let lower = detail.to_lowercase();
    if lower.contains("quota") || lower.contains("429") || lower.contains("exhausted") {
        BackendError::QuotaExceeded(detail)
    } else if mentions_duration(&lower) {
        BackendError::DurationExceeded(detail)
    } else if lower.contains("invalid") {
        BackendError::InvalidAudio(detail)
    } else {
        BackendError::ProviderError(detail)
    }
}

#[async_trait]
impl TranscriptionBackend for RecognizerBackend {
    fn name(&self) -> &'static str {
        "recognizer"
    }

    fn profile(&self) -> &BackendProfile {
        &self.profile
    }

    async fn recognize(
        &self,
        chunk_index: usize,
        payload: EncodedPayload,
        hints: &DomainHints,
    ) -> Result<String, BackendError> {
        self.config
            .check_payload(payload.sample_rate, payload.channels)
            .map_err(BackendError::InvalidAudio)?;

        let request = self.build_request(&payload, hints);
        drop(payload);

        debug!(
            "Recognizer request for chunk {} ({} base64 chars)",
            chunk_index + 1,
            request.audio.content.len()
        );

        let mut builder = self.http_client.post(self.config.api_url()).json(&request);
        builder = match &self.config.auth {
            RecognizerAuth::ApiKey(key) => builder.query(&[("key", key.as_str())]),
            RecognizerAuth::BearerToken(token) => builder.bearer_auth(token),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| BackendError::NetworkError(format!("Request failed: {e}")))?;

        let meta = ResponseMeta::from_headers(response.headers());
        if let Some(ref request_id) = meta.request_id {
            debug!("Recognizer request ID: {}", request_id);
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::NetworkError(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let error = classify_error(status.as_u16(), &body, &meta);
            warn!("Recognizer chunk {} failed: {}", chunk_index + 1, error);
            return Err(error);
        }

        let parsed: RecognizeResponse = serde_json::from_str(&body)
            .map_err(|e| BackendError::ProviderError(format!("Failed to parse response: {e}")))?;

        let transcript = parsed.transcript();
        debug!(
            "Recognizer chunk {}: {} results, {} chars",
            chunk_index + 1,
            parsed.results.len(),
            transcript.chars().count()
        );

        Ok(transcript)
    }
}
