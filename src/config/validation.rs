use crate::core::backend::generative::MAX_INLINE_PAYLOAD_BYTES;
use crate::core::backend::recognizer::MAX_SYNC_PAYLOAD_BYTES;
use crate::utils::validate_endpoint;

use super::TranscribeConfig;

/// Accepted range for the recognizer chunk window, in seconds.
pub const RECOGNIZER_CHUNK_SECONDS_RANGE: std::ops::RangeInclusive<u64> = 5..=60;

/// Validate chunk windows and payload ceilings against service limits.
pub fn validate_chunking(config: &TranscribeConfig) -> Result<(), String> {
    if !RECOGNIZER_CHUNK_SECONDS_RANGE.contains(&config.recognizer_chunk_seconds) {
        return Err(format!(
            "Recognizer chunk length must be between {} and {} seconds, got {}",
            RECOGNIZER_CHUNK_SECONDS_RANGE.start(),
            RECOGNIZER_CHUNK_SECONDS_RANGE.end(),
            config.recognizer_chunk_seconds
        ));
    }

    if config.generative_chunk_seconds == 0 {
        return Err("Generative chunk length must be positive".to_string());
    }

    if config.recognizer_max_payload_bytes == 0
        || config.recognizer_max_payload_bytes > MAX_SYNC_PAYLOAD_BYTES
    {
        return Err(format!(
            "Recognizer payload ceiling must be between 1 and {} bytes, got {}",
            MAX_SYNC_PAYLOAD_BYTES, config.recognizer_max_payload_bytes
        ));
    }

    if config.generative_max_payload_bytes == 0
        || config.generative_max_payload_bytes > MAX_INLINE_PAYLOAD_BYTES
    {
        return Err(format!(
            "Generative payload ceiling must be between 1 and {} bytes, got {}",
            MAX_INLINE_PAYLOAD_BYTES, config.generative_max_payload_bytes
        ));
    }

    Ok(())
}

/// Validate timeouts and concurrency limits.
pub fn validate_processing(config: &TranscribeConfig) -> Result<(), String> {
    for (name, value) in [
        ("Request timeout", config.request_timeout_seconds),
        ("Conversion timeout", config.conversion_timeout_seconds),
        ("Probe timeout", config.probe_timeout_seconds),
    ] {
        if value == 0 {
            return Err(format!("{name} must be positive"));
        }
    }

    if config.chunk_concurrency == 0 || config.file_concurrency == 0 {
        return Err("Concurrency limits must be at least 1".to_string());
    }

    Ok(())
}

/// Validate endpoint overrides.
pub fn validate_endpoints(config: &TranscribeConfig) -> Result<(), String> {
    for (name, endpoint) in [
        ("RECOGNIZER_ENDPOINT", &config.recognizer_endpoint),
        ("GEMINI_ENDPOINT", &config.gemini_endpoint),
    ] {
        if let Some(endpoint) = endpoint {
            validate_endpoint(endpoint).map_err(|e| format!("Invalid {name}: {e}"))?;
        }
    }
    Ok(())
}

/// Validate the recognition vocabulary.
pub fn validate_domain(config: &TranscribeConfig) -> Result<(), String> {
    if !(0.0..=20.0).contains(&config.domain_boost) {
        return Err(format!(
            "Domain boost must be between 0 and 20, got {}",
            config.domain_boost
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TranscribeConfig::default();
        assert!(validate_chunking(&config).is_ok());
        assert!(validate_processing(&config).is_ok());
        assert!(validate_endpoints(&config).is_ok());
        assert!(validate_domain(&config).is_ok());
    }

    #[test]
    fn test_chunk_window_bounds() {
        let mut config = TranscribeConfig::default();
        config.recognizer_chunk_seconds = 4;
        assert!(validate_chunking(&config).is_err());
        config.recognizer_chunk_seconds = 5;
        assert!(validate_chunking(&config).is_ok());
        config.recognizer_chunk_seconds = 61;
        assert!(validate_chunking(&config).unwrap_err().contains("between 5 and 60"));
    }

    #[test]
    fn test_payload_ceilings() {
        let mut config = TranscribeConfig::default();
        config.generative_max_payload_bytes = MAX_INLINE_PAYLOAD_BYTES + 1;
        assert!(validate_chunking(&config).is_err());
    }

    #[test]
    fn test_zero_concurrency() {
        let mut config = TranscribeConfig::default();
        config.file_concurrency = 0;
        assert!(validate_processing(&config).is_err());
    }

    #[test]
    fn test_plain_http_endpoint_rejected() {
        let mut config = TranscribeConfig::default();
        config.gemini_endpoint = Some("http://gemini.example.com".to_string());
        assert!(validate_endpoints(&config).unwrap_err().contains("GEMINI_ENDPOINT"));
        config.gemini_endpoint = Some("http://127.0.0.1:8080".to_string());
        assert!(validate_endpoints(&config).is_ok());
    }

    #[test]
    fn test_domain_boost_range() {
        let mut config = TranscribeConfig::default();
        config.domain_boost = 25.0;
        assert!(validate_domain(&config).is_err());
    }
}
