use serde::Deserialize;
use std::path::PathBuf;

use super::TranscribeConfig;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override environment variables and defaults.
///
/// # Example YAML structure
/// ```yaml
/// backends:
///   recognizer:
///     api_key: "your-speech-api-key"
///     language: "cmn-Hant-TW"
///     model: "latest_long"
///     chunk_seconds: 50
///     max_payload_bytes: 8388608
///   generative:
///     api_key: "your-gemini-key"
///     model: "gemini-2.0-flash-exp"
///     chunk_seconds: 600
///
/// audio:
///   ffmpeg_path: "/usr/bin/ffmpeg"
///   ffprobe_path: "/usr/bin/ffprobe"
///   conversion_timeout_seconds: 120
///   probe_timeout_seconds: 10
///
/// processing:
///   request_timeout_seconds: 120
///   chunk_concurrency: 4
///   file_concurrency: 2
///
/// domain:
///   phrases: ["OCC", "行控中心", "VVVF"]
///   boost: 15
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub backends: Option<BackendsYaml>,
    pub audio: Option<AudioYaml>,
    pub processing: Option<ProcessingYaml>,
    pub domain: Option<DomainYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BackendsYaml {
    pub recognizer: Option<RecognizerYaml>,
    pub generative: Option<GenerativeYaml>,
}

/// Speech-to-Text recognizer settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RecognizerYaml {
    pub api_key: Option<String>,
    /// OAuth bearer token; takes precedence over `api_key`
    pub access_token: Option<String>,
    pub language: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub chunk_seconds: Option<u64>,
    pub max_payload_bytes: Option<usize>,
}

/// Gemini settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GenerativeYaml {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    /// Replaces the built-in transcription instruction
    pub prompt: Option<String>,
    pub chunk_seconds: Option<u64>,
    pub max_payload_bytes: Option<usize>,
}

/// External audio tool settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AudioYaml {
    pub ffmpeg_path: Option<String>,
    pub ffprobe_path: Option<String>,
    pub conversion_timeout_seconds: Option<u64>,
    pub probe_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProcessingYaml {
    pub request_timeout_seconds: Option<u64>,
    pub chunk_concurrency: Option<usize>,
    pub file_concurrency: Option<usize>,
}

/// Recognition vocabulary from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DomainYaml {
    pub phrases: Option<Vec<String>>,
    pub boost: Option<f32>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }

    /// Overlay every value present in the file onto `config`.
    pub fn apply_to(self, config: &mut TranscribeConfig) {
        if let Some(backends) = self.backends {
            if let Some(r) = backends.recognizer {
                set_some(&mut config.recognizer_api_key, r.api_key);
                set_some(&mut config.recognizer_access_token, r.access_token);
                set(&mut config.recognizer_language, r.language);
                set(&mut config.recognizer_model, r.model);
                set_some(&mut config.recognizer_endpoint, r.endpoint);
                set(&mut config.recognizer_chunk_seconds, r.chunk_seconds);
                set(&mut config.recognizer_max_payload_bytes, r.max_payload_bytes);
            }
            if let Some(g) = backends.generative {
                set_some(&mut config.gemini_api_key, g.api_key);
                set(&mut config.gemini_model, g.model);
                set_some(&mut config.gemini_endpoint, g.endpoint);
                set_some(&mut config.gemini_prompt, g.prompt);
                set(&mut config.generative_chunk_seconds, g.chunk_seconds);
                set(&mut config.generative_max_payload_bytes, g.max_payload_bytes);
            }
        }

        if let Some(audio) = self.audio {
            set(&mut config.ffmpeg_path, audio.ffmpeg_path.map(PathBuf::from));
            set(&mut config.ffprobe_path, audio.ffprobe_path.map(PathBuf::from));
            set(&mut config.conversion_timeout_seconds, audio.conversion_timeout_seconds);
            set(&mut config.probe_timeout_seconds, audio.probe_timeout_seconds);
        }

        if let Some(processing) = self.processing {
            set(&mut config.request_timeout_seconds, processing.request_timeout_seconds);
            set(&mut config.chunk_concurrency, processing.chunk_concurrency);
            set(&mut config.file_concurrency, processing.file_concurrency);
        }

        if let Some(domain) = self.domain {
            set(&mut config.domain_phrases, domain.phrases);
            set(&mut config.domain_boost, domain.boost);
        }
    }
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn set_some<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}
