//! Google Cloud Speech-to-Text recognizer backend.
//!
//! Quota-limited synchronous recognition over REST. Each chunk is a separate
//! `speech:recognize` call with inline audio, so chunks stay under the
//! service's one-minute ceiling.
//!
//! # Features
//!
//! - LINEAR16 WAV payloads at 16kHz mono
//! - Phrase hints with boost from the domain vocabulary
//! - Automatic punctuation
//! - API key or OAuth bearer token authentication
//!
//! # Configuration
//!
//! ```bash
//! export GOOGLE_SPEECH_API_KEY="AIza..."
//! # or
//! export GOOGLE_SPEECH_ACCESS_TOKEN="ya29..."
//! ```
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use railscribe::core::backend::{RecognizerAuth, RecognizerBackend, RecognizerConfig};
//!
//! let config = RecognizerConfig {
//!     auth: RecognizerAuth::ApiKey("AIza...".to_string()),
//!     ..Default::default()
//! };
//! let backend = RecognizerBackend::with_config(config)?;
//! ```

mod client;
mod config;
mod messages;


pub use client::RecognizerBackend;
pub use config::{
    DEFAULT_LANGUAGE, DEFAULT_MAX_CHUNK_SECS, DEFAULT_MAX_PAYLOAD_BYTES, MAX_SYNC_DURATION_SECS,
    MAX_SYNC_PAYLOAD_BYTES, RECOGNIZER_URL, RecognizerAuth, RecognizerConfig, RecognizerModel,
};
pub use messages::{GoogleErrorResponse, RecognizeResponse};
