//! Integration tests for the Gemini provider
//!
//! A wiremock server stands in for the REST API, so these tests check the
//! wire contract: paths, headers, request bodies and status mapping.

use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use swarm_engine::config::LLMConfig;
use swarm_engine::llm::gemini::GeminiProvider;
use swarm_engine::llm::{
    Capability, FileState, GenerateRequest, GenerativeModel, LLMError, Part,
};
use swarm_engine::secrets::SecretString;

const GENERATE_PATH: &str = "/models/gemini-2.0-flash:generateContent";

fn provider(server: &MockServer) -> GeminiProvider {
    let config = LLMConfig {
        base_url: server.uri(),
        upload_base_url: format!("{}/upload", server.uri()),
        request_timeout_secs: 5,
        ..LLMConfig::default()
    };
    GeminiProvider::new(config, SecretString::new("test-key")).unwrap()
}

#[tokio::test]
async fn test_generate_sends_key_header_and_tools() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "Who won?" }] }],
            "systemInstruction": { "parts": [{ "text": "be precise" }] },
            "tools": [{ "googleSearch": {} }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Nobody yet." }] },
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = GenerateRequest::text("Who won?")
        .system("be precise")
        .capability(Capability::WebSearch);

    let response = provider(&server).generate(&request).await.unwrap();
    assert_eq!(response.text(), "Nobody yet.");
}

#[tokio::test]
async fn test_generate_decodes_code_execution_parts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Plotting." },
                        { "executableCode": { "language": "PYTHON", "code": "plt.show()" } },
                        { "codeExecutionResult": { "outcome": "OUTCOME_OK", "output": "" } },
                        { "inlineData": { "mimeType": "image/png", "data": "AQID" } }
                    ]
                }
            }]
        })))
        .mount(&server)
        .await;

    let request = GenerateRequest::text("plot").capability(Capability::CodeExecution);
    let response = provider(&server).generate(&request).await.unwrap();

    assert_eq!(response.parts.len(), 4);
    assert_eq!(
        response.parts[3],
        Part::InlineData {
            mime_type: "image/png".into(),
            data: vec![1, 2, 3],
        }
    );
}

#[tokio::test]
async fn test_rate_limit_maps_to_typed_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" }
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate(&GenerateRequest::text("hi"))
        .await
        .unwrap_err();

    assert!(matches!(err, LLMError::RateLimitExceeded));
    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn test_auth_and_request_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED" }
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate(&GenerateRequest::text("hi"))
        .await
        .unwrap_err();

    match err {
        LLMError::AuthenticationFailed(msg) => assert_eq!(msg, "API key not valid"),
        other => panic!("expected authentication failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_provider_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate(&GenerateRequest::text("hi"))
        .await
        .unwrap_err();

    assert!(matches!(err, LLMError::ProviderUnavailable(_)));
}

#[tokio::test]
async fn test_connection_error() {
    let config = LLMConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        request_timeout_secs: 5,
        ..LLMConfig::default()
    };
    let provider = GeminiProvider::new(config, SecretString::new("test-key")).unwrap();

    let err = provider
        .generate(&GenerateRequest::text("hi"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LLMError::ProviderUnavailable(_) | LLMError::NetworkError(_)
    ));
}

#[tokio::test]
async fn test_resumable_upload_and_lookup() {
    let server = MockServer::start().await;
    let session_url = format!("{}/upload-session/1", server.uri());

    Mock::given(method("POST"))
        .and(path("/upload/files"))
        .and(header("X-Goog-Upload-Protocol", "resumable"))
        .and(header("X-Goog-Upload-Command", "start"))
        .and(header("X-Goog-Upload-Header-Content-Type", "video/mp4"))
        .respond_with(ResponseTemplate::new(200).insert_header("x-goog-upload-url", session_url.as_str()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/upload-session/1"))
        .and(header("X-Goog-Upload-Offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file": {
                "name": "files/abc123",
                "uri": "https://generativelanguage.googleapis.com/v1beta/files/abc123",
                "mimeType": "video/mp4",
                "state": "PROCESSING"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "files/abc123",
            "uri": "https://generativelanguage.googleapis.com/v1beta/files/abc123",
            "mimeType": "video/mp4",
            "state": "ACTIVE"
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let video = dir.path().join("lecture.mp4");
    std::fs::write(&video, b"fake video bytes").unwrap();

    let provider = provider(&server);

    let uploaded = provider.upload_file(&video).await.unwrap();
    assert_eq!(uploaded.name, "files/abc123");
    assert_eq!(uploaded.state, FileState::Processing);

    let refreshed = provider.get_file(&uploaded.name).await.unwrap();
    assert_eq!(refreshed.state, FileState::Active);
    assert_eq!(refreshed.mime_type, "video/mp4");
}

#[tokio::test]
async fn test_upload_missing_file() {
    let server = MockServer::start().await;

    let err = provider(&server)
        .upload_file(Path::new("/nonexistent/lecture.mp4"))
        .await
        .unwrap_err();

    assert!(matches!(err, LLMError::UploadFailed(_)));
}

#[tokio::test]
async fn test_upload_without_session_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload/files"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let video = dir.path().join("clip.mov");
    std::fs::write(&video, b"bytes").unwrap();

    let err = provider(&server).upload_file(&video).await.unwrap_err();
    assert!(matches!(err, LLMError::UploadFailed(_)));
}
