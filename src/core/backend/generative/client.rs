//! Gemini generative transcription client.
//!
//! A single-shot `generateContent` call per chunk: the instruction prompt and
//! the chunk audio travel together as inline parts, and the model's text
//! reply is the transcript.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use tracing::{debug, warn};
use zeroize::Zeroize;

use super::config::GenerativeConfig;
use super::messages::{
    Content, GeminiErrorResponse, GenerateContentRequest, GenerateContentResponse,
    GenerationConfig, InlineData, Part,
};
use crate::core::backend::{
    BackendError, BackendProfile, DomainHints, EncodedPayload, ResponseMeta, TranscriptionBackend,
    build_http_client,
};
use crate::utils::truncate_chars;

/// Maximum characters of a raw error body kept in error details.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Gemini-backed transcription.
pub struct GenerativeBackend {
    config: GenerativeConfig,
    profile: BackendProfile,
    http_client: Client,
}

impl GenerativeBackend {
    pub fn with_config(config: GenerativeConfig) -> Result<Self, BackendError> {
        config.validate().map_err(BackendError::ConfigurationError)?;

        let http_client = build_http_client(config.request_timeout)?;
        let profile = config.profile();

        Ok(Self {
            config,
            profile,
            http_client,
        })
    }

    pub fn config(&self) -> &GenerativeConfig {
        &self.config
    }

    pub(crate) fn build_request(
        &self,
        payload: &EncodedPayload,
        hints: &DomainHints,
    ) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::Text {
                        text: self.config.build_prompt(hints),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: payload.mime_type.clone(),
                            data: BASE64.encode(&payload.bytes),
                        },
                    },
                ],
            }],
            generation_config: Some(GenerationConfig {
                temperature: self.config.temperature,
            }),
        }
    }
}

impl Drop for GenerativeBackend {
    fn drop(&mut self) {
        self.config.api_key.zeroize();
    }
}

/// Map an error response to a structured error.
pub(crate) fn classify_error(status: u16, body: &str, meta: &ResponseMeta) -> BackendError {
    let suffix = meta.suffix();

    let Ok(parsed) = serde_json::from_str::<GeminiErrorResponse>(body) else {
        let detail = format!(
            "Gemini API error ({}): {}{}",
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
    let lower = error.message.to_lowercase();

    match (status, error.status.as_str()) {
        (429, _) | (_, "RESOURCE_EXHAUSTED") => BackendError::QuotaExceeded(detail),
        (401, _) | (403, _) | (_, "UNAUTHENTICATED") | (_, "PERMISSION_DENIED") => {
            BackendError::AuthenticationFailed(detail)
        }
        // An invalid key is reported as INVALID_ARGUMENT by this API.
        (_, "INVALID_ARGUMENT") | (400, _) if lower.contains("api key") => {
            BackendError::AuthenticationFailed(detail)
        }
        (_, "INVALID_ARGUMENT") | (400, _)
            if lower.contains("mime") || lower.contains("unsupported") =>
        {
            BackendError::UnsupportedFormat(detail)
        }
        (_, "INVALID_ARGUMENT") | (400, _) => BackendError::ProviderError(detail),
        (500..=599, _) => BackendError::ProviderError(format!("Server error: {detail}")),
        _ => classify_message(detail),
    }
}

/// Last-resort mapping when the service gave no structured status.
pub(crate) fn classify_message(detail: String) -> BackendError {
    let lower = detail.to_lowercase();
    if lower.contains("quota") || lower.contains("429") || lower.contains("exhausted") {
        BackendError::QuotaExceeded(detail)
    } else if lower.contains("safety") || lower.contains("blocked") {
        BackendError::ContentFiltered(detail)
    } else if lower.contains("api key") || lower.contains("permission") {
        BackendError::AuthenticationFailed(detail)
    } else if lower.contains("unsupported") || lower.contains("invalid") || lower.contains("mime") {
        BackendError::UnsupportedFormat(detail)
    } else {
        BackendError::ProviderError(detail)
    }
}

#[async_trait]
impl TranscriptionBackend for GenerativeBackend {
    fn name(&self) -> &'static str {
        "generative"
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
        let mime_type = payload.mime_type.clone();
        let request = self.build_request(&payload, hints);
        drop(payload);

        debug!(
            "Gemini request for chunk {} ({}, model {})",
            chunk_index + 1,
            mime_type,
            self.config.model
        );

        let response = self
            .http_client
            .post(self.config.api_url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::NetworkError(format!("Request failed: {e}")))?;

        let meta = ResponseMeta::from_headers(response.headers());
        if let Some(ref request_id) = meta.request_id {
            debug!("Gemini request ID: {}", request_id);
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::NetworkError(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let error = classify_error(status.as_u16(), &body, &meta);
            warn!("Gemini chunk {} failed: {}", chunk_index + 1, error);
            return Err(error);
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| BackendError::ProviderError(format!("Failed to parse response: {e}")))?;

        if let Some(reason) = parsed.block_reason() {
            warn!("Gemini withheld chunk {}: {}", chunk_index + 1, reason);
            return Err(BackendError::ContentFiltered(format!(
                "response blocked ({reason}){}",
                meta.suffix()
            )));
        }

        let text = parsed.text().trim().to_string();
        debug!("Gemini chunk {}: {} chars", chunk_index + 1, text.chars().count());
        Ok(text)
    }
}
