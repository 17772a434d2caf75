//! Gemini generative transcription backend.
//!
//! Single-shot transcription through a multimodal model: the instruction
//! prompt and the compressed chunk audio are sent inline and the reply text
//! is the transcript. Phrase biasing is not supported by the API, so the
//! domain vocabulary is appended to the prompt instead.
//!
//! # Configuration
//!
//! ```bash
//! export GEMINI_API_KEY="..."
//! export GEMINI_MODEL="gemini-2.0-flash-exp"
//! ```
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use railscribe::core::backend::{GenerativeBackend, GenerativeConfig};
//!
//! let config = GenerativeConfig {
//!     api_key: "...".to_string(),
//!     ..Default::default()
//! };
//! let backend = GenerativeBackend::with_config(config)?;
//! ```

mod client;
mod config;
mod messages;


pub use client::GenerativeBackend;
pub use config::{
    DEFAULT_MAX_CHUNK_SECS, DEFAULT_MAX_PAYLOAD_BYTES, DEFAULT_MODEL, DEFAULT_PROMPT,
    GEMINI_BASE_URL, GenerativeConfig, MAX_INLINE_PAYLOAD_BYTES,
};
pub use messages::{GeminiErrorResponse, GenerateContentResponse};
