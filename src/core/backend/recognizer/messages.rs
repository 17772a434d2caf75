//! Wire types for `speech:recognize` requests, responses, and errors.

use serde::{Deserialize, Serialize};

// =============================================================================
// Request
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RecognizeRequest {
    pub config: RecognitionConfig,
    pub audio: RecognitionAudio,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionConfig {
    pub encoding: String,
    pub sample_rate_hertz: u32,
    pub audio_channel_count: u16,
    pub language_code: String,
    pub enable_automatic_punctuation: bool,
    pub model: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub speech_contexts: Vec<SpeechContext>,
}

/// Phrase hints with an optional boost.
#[derive(Debug, Clone, Serialize)]
pub struct SpeechContext {
    pub phrases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boost: Option<f32>,
}

/// Inline audio, base64 encoded.
#[derive(Debug, Clone, Serialize)]
pub struct RecognitionAudio {
    pub content: String,
}

// =============================================================================
// Response
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizeResponse {
    #[serde(default)]
    pub results: Vec<SpeechRecognitionResult>,
    #[serde(default)]
    pub total_billed_time: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRecognitionResult {
    #[serde(default)]
    pub alternatives: Vec<SpeechRecognitionAlternative>,
    #[serde(default)]
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechRecognitionAlternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl RecognizeResponse {
    /// Top alternative of every result, joined in order.
    ///
    /// An empty response (silence) yields an empty string.
    pub fn transcript(&self) -> String {
        self.results
            .iter()
            .filter_map(|r| r.alternatives.first())
            .map(|a| a.transcript.as_str())
            .collect()
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Standard Google API error envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleErrorResponse {
    pub error: GoogleErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    /// Canonical status such as `RESOURCE_EXHAUSTED` or `INVALID_ARGUMENT`.
    #[serde(default)]
    pub status: String,
}
