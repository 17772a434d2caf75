//! Integration tests for the Speech-to-Text recognizer backend
//!
//! These tests run the real HTTP client against a wiremock server:
//! - Request shape (auth, config, speech contexts, inline audio)
//! - Transcript extraction from multi-result responses
//! - Structured error classification (quota, duration, credentials)
//! - Request-id and retry-after capture in error details

mod fixtures;

use std::time::Duration;

use bytes::Bytes;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fixtures::*;
use railscribe::core::audio::wav;
use railscribe::core::backend::recognizer::{RecognizerAuth, RecognizerBackend, RecognizerConfig};
use railscribe::{BackendError, DomainHints, EncodedPayload, TranscriptionBackend};

const RECOGNIZE_PATH: &str = "/v1/speech:recognize";

fn backend(server: &MockServer, auth: RecognizerAuth) -> RecognizerBackend {
    let config = RecognizerConfig {
        auth,
        ..Default::default()
    }
    .with_endpoint(format!("{}{}", server.uri(), RECOGNIZE_PATH))
    .with_request_timeout(Duration::from_secs(5));
    RecognizerBackend::with_config(config).unwrap()
}

fn one_second_payload() -> EncodedPayload {
    let pcm = samples_to_bytes(&generate_sine_wave(SECOND, 440.0, 0.5));
    EncodedPayload {
        bytes: Bytes::from(wav::create_wav(&pcm, SAMPLE_RATE, 1)),
        mime_type: "audio/wav".to_string(),
        sample_rate: SAMPLE_RATE,
        channels: 1,
    }
}

fn hints() -> DomainHints {
    DomainHints::new(vec!["OCC".to_string(), "月台".to_string()], 15.0)
}

#[tokio::test]
async fn test_recognize_joins_results_with_api_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RECOGNIZE_PATH))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "config": {
                "encoding": "LINEAR16",
                "sampleRateHertz": 16000,
                "audioChannelCount": 1,
                "languageCode": "cmn-Hant-TW",
                "enableAutomaticPunctuation": true,
                "model": "latest_long",
                "speechContexts": [{"phrases": ["OCC", "月台"], "boost": 15.0}]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"alternatives": [{"transcript": "OCC呼叫", "confidence": 0.91}, {"transcript": "OC呼叫"}]},
                {"alternatives": [{"transcript": "月台淨空。"}]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server, RecognizerAuth::ApiKey("test-key".to_string()));
    let text = backend.recognize(0, one_second_payload(), &hints()).await.unwrap();

    assert_eq!(text, "OCC呼叫月台淨空。");
}

#[tokio::test]
async fn test_recognize_with_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RECOGNIZE_PATH))
        .and(header("authorization", "Bearer ya29.token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server, RecognizerAuth::BearerToken("ya29.token".to_string()));
    let text = backend
        .recognize(0, one_second_payload(), &DomainHints::none())
        .await
        .unwrap();

    // Silence comes back with no results.
    assert_eq!(text, "");
}

#[tokio::test]
async fn test_quota_exhausted_maps_to_quota_exceeded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RECOGNIZE_PATH))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("x-goog-request-id", "req-123")
                .insert_header("retry-after", "30")
                .set_body_json(json!({
                    "error": {
                        "code": 429,
                        "message": "Quota exceeded for quota metric 'Requests'",
                        "status": "RESOURCE_EXHAUSTED"
                    }
                })),
        )
        .mount(&server)
        .await;

    let backend = backend(&server, RecognizerAuth::ApiKey("test-key".to_string()));
    let err = backend
        .recognize(1, one_second_payload(), &hints())
        .await
        .unwrap_err();

    match err {
        BackendError::QuotaExceeded(detail) => {
            assert!(detail.contains("req-123"));
            assert!(detail.contains("retry after 30s"));
        }
        other => panic!("expected QuotaExceeded, got {other:?}"),
    }
}

#[tokio::test]
async fn test_sync_limit_maps_to_duration_exceeded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RECOGNIZE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "Sync input too long. For audio longer than 1 min use LongRunningRecognize with a 'uri' parameter.",
                "status": "INVALID_ARGUMENT"
            }
        })))
        .mount(&server)
        .await;

    let backend = backend(&server, RecognizerAuth::ApiKey("test-key".to_string()));
    let err = backend
        .recognize(0, one_second_payload(), &hints())
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::DurationExceeded(_)));
}

#[tokio::test]
async fn test_bad_audio_maps_to_invalid_audio() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RECOGNIZE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "Invalid recognition 'config': bad encoding.",
                "status": "INVALID_ARGUMENT"
            }
        })))
        .mount(&server)
        .await;

    let backend = backend(&server, RecognizerAuth::ApiKey("test-key".to_string()));
    let err = backend
        .recognize(0, one_second_payload(), &hints())
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::InvalidAudio(_)));
}

#[tokio::test]
async fn test_forbidden_maps_to_authentication_failed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RECOGNIZE_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let backend = backend(&server, RecognizerAuth::ApiKey("wrong-key".to_string()));
    let err = backend
        .recognize(0, one_second_payload(), &hints())
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::AuthenticationFailed(_)));
}

#[tokio::test]
async fn test_server_error_maps_to_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RECOGNIZE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let backend = backend(&server, RecognizerAuth::ApiKey("test-key".to_string()));
    let err = backend
        .recognize(0, one_second_payload(), &hints())
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::ProviderError(_)));
    // Unknown errors collapse to the generic marker kind.
    assert_eq!(err.kind().describe(), "recognition failed");
}
