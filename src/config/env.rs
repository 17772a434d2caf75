use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::TranscribeConfig;

/// Read an environment variable, treating empty values as unset.
pub(super) fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, failing with the variable name on bad input.
pub(super) fn env_parse<T>(key: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {key} ('{raw}'): {e}").into()),
        None => Ok(None),
    }
}

/// Split a comma separated list, dropping blanks.
pub(super) fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build configuration from environment variables over defaults.
///
/// `.env` values are expected to be loaded into the process environment
/// already (the binary does this at startup).
pub(super) fn load_from_env() -> Result<TranscribeConfig, Box<dyn std::error::Error>> {
    let mut config = TranscribeConfig::default();

    config.recognizer_api_key = env_var("GOOGLE_SPEECH_API_KEY");
    config.recognizer_access_token = env_var("GOOGLE_SPEECH_ACCESS_TOKEN");
    config.gemini_api_key = env_var("GEMINI_API_KEY");

    if let Some(language) = env_var("RECOGNIZER_LANGUAGE") {
        config.recognizer_language = language;
    }
    if let Some(model) = env_var("RECOGNIZER_MODEL") {
        config.recognizer_model = model;
    }
    if let Some(model) = env_var("GEMINI_MODEL") {
        config.gemini_model = model;
    }
    config.recognizer_endpoint = env_var("RECOGNIZER_ENDPOINT");
    config.gemini_endpoint = env_var("GEMINI_ENDPOINT");

    if let Some(secs) = env_parse("CHUNK_SECONDS")? {
        config.recognizer_chunk_seconds = secs;
    }
    if let Some(secs) = env_parse("GENERATIVE_CHUNK_SECONDS")? {
        config.generative_chunk_seconds = secs;
    }
    if let Some(bytes) = env_parse("RECOGNIZER_MAX_PAYLOAD_BYTES")? {
        config.recognizer_max_payload_bytes = bytes;
    }
    if let Some(bytes) = env_parse("GENERATIVE_MAX_PAYLOAD_BYTES")? {
        config.generative_max_payload_bytes = bytes;
    }

    if let Some(secs) = env_parse("REQUEST_TIMEOUT_SECONDS")? {
        config.request_timeout_seconds = secs;
    }
    if let Some(secs) = env_parse("CONVERSION_TIMEOUT_SECONDS")? {
        config.conversion_timeout_seconds = secs;
    }
    if let Some(secs) = env_parse("PROBE_TIMEOUT_SECONDS")? {
        config.probe_timeout_seconds = secs;
    }

    if let Some(n) = env_parse("CHUNK_CONCURRENCY")? {
        config.chunk_concurrency = n;
    }
    if let Some(n) = env_parse("FILE_CONCURRENCY")? {
        config.file_concurrency = n;
    }

    if let Some(path) = env_var("FFMPEG_PATH") {
        config.ffmpeg_path = PathBuf::from(path);
    }
    if let Some(path) = env_var("FFPROBE_PATH") {
        config.ffprobe_path = PathBuf::from(path);
    }

    if let Some(phrases) = env_var("DOMAIN_PHRASES") {
        config.domain_phrases = parse_list(&phrases);
    }
    if let Some(boost) = env_parse("DOMAIN_BOOST")? {
        config.domain_boost = boost;
    }

    Ok(config)
}
