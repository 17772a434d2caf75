//! Configuration module for Railscribe
//!
//! Configuration comes from YAML files, environment variables, and `.env`
//! files. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use railscribe::config::TranscribeConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = TranscribeConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config_path = PathBuf::from("config.yaml");
//! let config = TranscribeConfig::from_file(&config_path)?;
//! println!("Chunk window: {}s", config.recognizer_chunk_seconds);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

mod env;
mod validation;
mod yaml;

pub use validation::RECOGNIZER_CHUNK_SECONDS_RANGE;
pub use yaml::YamlConfig;

use crate::core::audio::{DEFAULT_CONVERSION_TIMEOUT_SECS, DEFAULT_PROBE_TIMEOUT_SECS};
use crate::core::backend::{DEFAULT_DOMAIN_BOOST, DEFAULT_DOMAIN_PHRASES, DomainHints};
use crate::core::backend::{generative, recognizer};
use crate::core::pipeline::{DEFAULT_CHUNK_CONCURRENCY, DEFAULT_FILE_CONCURRENCY};

/// Application configuration
///
/// Credentials live here only until a backend is constructed from them; each
/// backend then holds its own copy.
#[derive(Debug, Clone)]
pub struct TranscribeConfig {
    // Recognizer (Speech-to-Text)
    pub recognizer_api_key: Option<String>,
    /// OAuth bearer token; preferred over the API key when both are set
    pub recognizer_access_token: Option<String>,
    pub recognizer_language: String,
    pub recognizer_model: String,
    pub recognizer_endpoint: Option<String>,
    /// Chunk window in seconds (5..=60)
    pub recognizer_chunk_seconds: u64,
    pub recognizer_max_payload_bytes: usize,

    // Generative (Gemini)
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_endpoint: Option<String>,
    pub gemini_prompt: Option<String>,
    pub generative_chunk_seconds: u64,
    pub generative_max_payload_bytes: usize,

    // Timeouts
    pub request_timeout_seconds: u64,
    pub conversion_timeout_seconds: u64,
    pub probe_timeout_seconds: u64,

    // Audio tools
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,

    // Concurrency
    pub chunk_concurrency: usize,
    pub file_concurrency: usize,

    // Recognition vocabulary
    pub domain_phrases: Vec<String>,
    pub domain_boost: f32,
}

impl Default for TranscribeConfig {
    fn default() -> Self {
        Self {
            recognizer_api_key: None,
            recognizer_access_token: None,
            recognizer_language: recognizer::DEFAULT_LANGUAGE.to_string(),
            recognizer_model: "latest_long".to_string(),
            recognizer_endpoint: None,
            recognizer_chunk_seconds: recognizer::DEFAULT_MAX_CHUNK_SECS,
            recognizer_max_payload_bytes: recognizer::DEFAULT_MAX_PAYLOAD_BYTES,
            gemini_api_key: None,
            gemini_model: generative::DEFAULT_MODEL.to_string(),
            gemini_endpoint: None,
            gemini_prompt: None,
            generative_chunk_seconds: generative::DEFAULT_MAX_CHUNK_SECS,
            generative_max_payload_bytes: generative::DEFAULT_MAX_PAYLOAD_BYTES,
            request_timeout_seconds: 120,
            conversion_timeout_seconds: DEFAULT_CONVERSION_TIMEOUT_SECS,
            probe_timeout_seconds: DEFAULT_PROBE_TIMEOUT_SECS,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            chunk_concurrency: DEFAULT_CHUNK_CONCURRENCY,
            file_concurrency: DEFAULT_FILE_CONCURRENCY,
            domain_phrases: DEFAULT_DOMAIN_PHRASES.iter().map(|p| p.to_string()).collect(),
            domain_boost: DEFAULT_DOMAIN_BOOST,
        }
    }
}

/// Zeroize every credential when the configuration is dropped.
impl Drop for TranscribeConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.recognizer_api_key {
            key.zeroize();
        }
        if let Some(ref mut token) = self.recognizer_access_token {
            token.zeroize();
        }
        if let Some(ref mut key) = self.gemini_api_key {
            key.zeroize();
        }
    }
}

impl TranscribeConfig {
    /// Load configuration from environment variables over defaults
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format or the resulting
    /// configuration fails validation.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = env::load_from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Environment variables (including `.env` values loaded at startup)
    /// provide the base, and values present in the YAML file override them.
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;

        let mut config = env::load_from_env()?;
        yaml_config.apply_to(&mut config);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        validation::validate_chunking(self)?;
        validation::validate_processing(self)?;
        validation::validate_endpoints(self)?;
        validation::validate_domain(self)?;
        Ok(())
    }

    /// Get the credential for a backend
    ///
    /// For the recognizer this is the bearer token when one is configured,
    /// otherwise the API key.
    pub fn get_api_key(&self, backend: &str) -> Result<String, String> {
        match backend.to_lowercase().as_str() {
            "recognizer" | "stt" | "google" => self
                .recognizer_access_token
                .as_ref()
                .or(self.recognizer_api_key.as_ref())
                .cloned()
                .ok_or_else(|| {
                    "Speech-to-Text credentials not configured (set GOOGLE_SPEECH_API_KEY or GOOGLE_SPEECH_ACCESS_TOKEN)"
                        .to_string()
                }),
            "generative" | "gemini" => self.gemini_api_key.as_ref().cloned().ok_or_else(|| {
                "Gemini API key not configured (set GEMINI_API_KEY)".to_string()
            }),
            _ => Err(format!("Unsupported backend: {backend}")),
        }
    }

    /// Recognition vocabulary as backend hints.
    pub fn domain_hints(&self) -> DomainHints {
        DomainHints::new(self.domain_phrases.clone(), self.domain_boost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env as std_env;
    use std::fs;
    use tempfile::TempDir;

    const ENV_VARS: &[&str] = &[
        "GOOGLE_SPEECH_API_KEY",
        "GOOGLE_SPEECH_ACCESS_TOKEN",
        "GEMINI_API_KEY",
        "RECOGNIZER_LANGUAGE",
        "RECOGNIZER_MODEL",
        "GEMINI_MODEL",
        "CHUNK_SECONDS",
        "GENERATIVE_CHUNK_SECONDS",
        "RECOGNIZER_MAX_PAYLOAD_BYTES",
        "GENERATIVE_MAX_PAYLOAD_BYTES",
        "REQUEST_TIMEOUT_SECONDS",
        "CONVERSION_TIMEOUT_SECONDS",
        "PROBE_TIMEOUT_SECONDS",
        "CHUNK_CONCURRENCY",
        "FILE_CONCURRENCY",
        "FFMPEG_PATH",
        "FFPROBE_PATH",
        "RECOGNIZER_ENDPOINT",
        "GEMINI_ENDPOINT",
        "DOMAIN_PHRASES",
        "DOMAIN_BOOST",
    ];

    // Helper to clean up environment variables
    fn cleanup_env_vars() {
        unsafe {
            for var in ENV_VARS {
                std_env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_get_api_key() {
        let mut config = TranscribeConfig::default();
        assert!(config.get_api_key("recognizer").is_err());
        assert!(config.get_api_key("gemini").unwrap_err().contains("GEMINI_API_KEY"));

        config.recognizer_api_key = Some("rk".to_string());
        config.gemini_api_key = Some("gk".to_string());
        assert_eq!(config.get_api_key("recognizer").unwrap(), "rk");
        assert_eq!(config.get_api_key("Generative").unwrap(), "gk");

        config.recognizer_access_token = Some("ya29.token".to_string());
        assert_eq!(config.get_api_key("STT").unwrap(), "ya29.token");

        assert!(config.get_api_key("whisper").unwrap_err().contains("Unsupported"));
    }

    #[test]
    fn test_domain_hints_default() {
        let hints = TranscribeConfig::default().domain_hints();
        assert_eq!(hints.phrases.len(), DEFAULT_DOMAIN_PHRASES.len());
        assert_eq!(hints.boost, 15.0);
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        cleanup_env_vars();

        let config = TranscribeConfig::from_env().unwrap();
        assert_eq!(config.recognizer_chunk_seconds, 50);
        assert_eq!(config.generative_chunk_seconds, 600);
        assert_eq!(config.recognizer_language, "cmn-Hant-TW");
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert!(config.gemini_api_key.is_none());

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_values() {
        cleanup_env_vars();
        unsafe {
            std_env::set_var("GEMINI_API_KEY", "env-gk");
            std_env::set_var("CHUNK_SECONDS", "30");
            std_env::set_var("DOMAIN_PHRASES", "OCC, 月台");
            std_env::set_var("FILE_CONCURRENCY", "1");
        }

        let config = TranscribeConfig::from_env().unwrap();
        assert_eq!(config.gemini_api_key, Some("env-gk".to_string()));
        assert_eq!(config.recognizer_chunk_seconds, 30);
        assert_eq!(config.domain_phrases, vec!["OCC", "月台"]);
        assert_eq!(config.file_concurrency, 1);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_out_of_range_chunk() {
        cleanup_env_vars();
        unsafe {
            std_env::set_var("CHUNK_SECONDS", "90");
        }

        let err = TranscribeConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("between 5 and 60"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_malformed_number() {
        cleanup_env_vars();
        unsafe {
            std_env::set_var("REQUEST_TIMEOUT_SECONDS", "soon");
        }

        let err = TranscribeConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("REQUEST_TIMEOUT_SECONDS"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(
            &config_path,
            r#"
backends:
  generative:
    api_key: "yaml-key"
processing:
  chunk_concurrency: 6
"#,
        )
        .unwrap();

        unsafe {
            std_env::set_var("GEMINI_API_KEY", "env-key");
            std_env::set_var("GOOGLE_SPEECH_API_KEY", "env-rk");
            std_env::set_var("CHUNK_CONCURRENCY", "2");
        }

        let config = TranscribeConfig::from_file(&config_path).unwrap();

        // YAML overrides ENV
        assert_eq!(config.gemini_api_key, Some("yaml-key".to_string()));
        assert_eq!(config.chunk_concurrency, 6);
        // ENV value survives where YAML is silent
        assert_eq!(config.recognizer_api_key, Some("env-rk".to_string()));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();

        let config_path = PathBuf::from("/nonexistent/config.yaml");
        let result = TranscribeConfig::from_file(&config_path);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );

        cleanup_env_vars();
    }
}
