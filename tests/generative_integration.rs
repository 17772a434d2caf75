//! Integration tests for the Gemini generative backend
//!
//! The real HTTP client runs against a wiremock server standing in for
//! `generateContent`.

mod fixtures;

use bytes::Bytes;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fixtures::*;
use railscribe::core::backend::generative::{GenerativeBackend, GenerativeConfig};
use railscribe::{BackendError, DomainHints, EncodedPayload, FailureKind, TranscriptionBackend};

const MODEL_PATH: &str = "/v1beta/models/gemini-2.0-flash-exp:generateContent";

fn backend(server: &MockServer) -> GenerativeBackend {
    let config = GenerativeConfig {
        api_key: "test-gemini-key".to_string(),
        ..Default::default()
    }
    .with_endpoint(format!("{}/v1beta/models", server.uri()));
    GenerativeBackend::with_config(config).unwrap()
}

fn m4a_payload() -> EncodedPayload {
    // Content is opaque to the backend; any bytes will do.
    EncodedPayload {
        bytes: Bytes::from(samples_to_bytes(&generate_silence(1600))),
        mime_type: "audio/mp4".to_string(),
        sample_rate: SAMPLE_RATE,
        channels: 1,
    }
}

#[tokio::test]
async fn test_generate_content_returns_trimmed_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(header("x-goog-api-key", "test-gemini-key"))
        .and(body_partial_json(json!({"generationConfig": {"temperature": 0.0}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [{"text": "OCC呼叫十二號車。"}, {"text": "\n收到。\n"}]},
                "finishReason": "STOP"
            }],
            "modelVersion": "gemini-2.0-flash-exp"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    let hints = DomainHints::new(vec!["VVVF".to_string()], 15.0);
    let text = backend.recognize(0, m4a_payload(), &hints).await.unwrap();

    assert_eq!(text, "OCC呼叫十二號車。\n收到。");
}

#[tokio::test]
async fn test_request_carries_mime_type_and_vocabulary() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "收到"}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    let hints = DomainHints::new(vec!["行控中心".to_string(), "Bypass".to_string()], 15.0);
    let text = backend.recognize(2, m4a_payload(), &hints).await.unwrap();
    assert_eq!(text, "收到");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let parts = &body["contents"][0]["parts"];

    let prompt = parts[0]["text"].as_str().unwrap();
    assert!(prompt.contains("verbatim"));
    assert!(prompt.contains("行控中心, Bypass"));

    assert_eq!(parts[1]["inline_data"]["mime_type"], "audio/mp4");
    assert!(!parts[1]["inline_data"]["data"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_prompt_feedback_block_is_content_filtered() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .mount(&server)
        .await;

    let err = backend(&server)
        .recognize(0, m4a_payload(), &DomainHints::none())
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::ContentFiltered(_)));
    assert_eq!(err.kind(), FailureKind::ContentFiltered);
}

#[tokio::test]
async fn test_safety_finish_reason_is_content_filtered() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": []}, "finishReason": "SAFETY"}]
        })))
        .mount(&server)
        .await;

    let err = backend(&server)
        .recognize(0, m4a_payload(), &DomainHints::none())
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::ContentFiltered(_)));
}

#[tokio::test]
async fn test_resource_exhausted_is_quota() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "code": 429,
                "message": "Resource has been exhausted (e.g. check quota).",
                "status": "RESOURCE_EXHAUSTED"
            }
        })))
        .mount(&server)
        .await;

    let err = backend(&server)
        .recognize(0, m4a_payload(), &DomainHints::none())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::QuotaExceeded);
    assert_eq!(err.kind().marker(3), "[chunk 3: quota exceeded]");
}

#[tokio::test]
async fn test_unsupported_mime_is_unsupported_format() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "Unsupported MIME type: audio/x-foo",
                "status": "INVALID_ARGUMENT"
            }
        })))
        .mount(&server)
        .await;

    let err = backend(&server)
        .recognize(0, m4a_payload(), &DomainHints::none())
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::UnsupportedFormat(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    // Bind and drop a listener so nothing answers on the port.
    let uri = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        format!("http://{}", listener.local_addr().unwrap())
    };
    let config = GenerativeConfig {
        api_key: "test-gemini-key".to_string(),
        ..Default::default()
    }
    .with_endpoint(format!("{uri}/v1beta/models"));
    let backend = GenerativeBackend::with_config(config).unwrap();

    let err = backend
        .recognize(0, m4a_payload(), &DomainHints::none())
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::NetworkError(_)));
}
