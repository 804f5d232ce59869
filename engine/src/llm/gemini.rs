//! Gemini Provider
//!
//! Implements `GenerativeModel` over the Gemini REST API:
//!
//! - `POST {base}/models/{model}:generateContent` for every request
//! - resumable media upload at `{upload_base}/files` (start, then upload + finalize)
//! - `GET {base}/{name}` to poll an uploaded file's processing state
//!
//! The API key travels in the `x-goog-api-key` header so it never shows up
//! in URLs, and therefore never in reqwest error messages.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

use super::{
    Capability, FileState, GenerateRequest, GenerateResponse, GenerativeModel, LLMError, Part,
    Result, UploadedFile,
};
use crate::config::LLMConfig;
use crate::secrets::{self, SecretString};

pub struct GeminiProvider {
    config: LLMConfig,
    api_key: SecretString,
    client: Client,
}

impl GeminiProvider {
    /// Create a provider for the configured model
    ///
    /// # Errors
    /// Returns `LLMError::ProviderUnavailable` if the HTTP client cannot be built.
    pub fn new(config: LLMConfig, api_key: SecretString) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                LLMError::ProviderUnavailable(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn map_send_error(&self, e: reqwest::Error) -> LLMError {
        if e.is_timeout() {
            LLMError::Timeout
        } else if e.is_connect() {
            LLMError::ProviderUnavailable(format!(
                "Cannot connect to Gemini at {}",
                self.config.base_url
            ))
        } else {
            LLMError::NetworkError(secrets::scrub(&e.to_string()))
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );

        let payload = build_payload(request);

        tracing::debug!(
            "Gemini request: model={}, parts={}, capabilities={:?}",
            self.config.model,
            request.parts.len(),
            request.capabilities
        );

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.unsecure())
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let response = check_status(response).await?;

        tracing::debug!(
            "Gemini response received in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        let data: Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        parse_response(data)
    }

    async fn upload_file(&self, path: &Path) -> Result<UploadedFile> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            LLMError::UploadFailed(format!("Cannot read {}: {}", path.display(), e))
        })?;

        let mime_type = mime_for_path(path);
        let display_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        tracing::info!(
            "Uploading {} ({} bytes, {})",
            display_name,
            bytes.len(),
            mime_type
        );

        let start = self
            .client
            .post(format!("{}/files", self.config.upload_base_url))
            .header("x-goog-api-key", self.api_key.unsecure())
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let start = check_status(start).await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                LLMError::UploadFailed("Upload session did not return an upload URL".to_string())
            })?;

        let finished = self
            .client
            .post(&upload_url)
            .header("x-goog-api-key", self.api_key.unsecure())
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let finished = check_status(finished).await?;

        let envelope: WireUploadResponse = finished
            .json()
            .await
            .map_err(|e| LLMError::ParseError(format!("Invalid upload response: {}", e)))?;

        let file = envelope.file.into_uploaded(mime_type);
        tracing::info!("Uploaded {} as {} ({:?})", display_name, file.name, file.state);
        Ok(file)
    }

    async fn get_file(&self, name: &str) -> Result<UploadedFile> {
        let url = format!("{}/{}", self.config.base_url, name);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", self.api_key.unsecure())
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let response = check_status(response).await?;

        let file: WireFile = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(format!("Invalid file metadata: {}", e)))?;

        Ok(file.into_uploaded("application/octet-stream"))
    }
}

/// Build the generateContent JSON body
pub(crate) fn build_payload(request: &GenerateRequest) -> Value {
    let parts: Vec<Value> = request.parts.iter().map(part_to_json).collect();

    let mut payload = serde_json::Map::new();
    payload.insert(
        "contents".to_string(),
        json!([{ "role": "user", "parts": parts }]),
    );

    if let Some(system) = &request.system_instruction {
        payload.insert(
            "systemInstruction".to_string(),
            json!({ "parts": [{ "text": system }] }),
        );
    }

    if !request.capabilities.is_empty() {
        let tools: Vec<Value> = request
            .capabilities
            .iter()
            .map(|c| match c {
                Capability::WebSearch => json!({ "googleSearch": {} }),
                Capability::CodeExecution => json!({ "codeExecution": {} }),
            })
            .collect();
        payload.insert("tools".to_string(), Value::Array(tools));
    }

    Value::Object(payload)
}

fn part_to_json(part: &Part) -> Value {
    match part {
        Part::Text(text) => json!({ "text": text }),
        Part::ExecutableCode { language, code } => {
            json!({ "executableCode": { "language": language, "code": code } })
        }
        Part::CodeExecutionResult { outcome, output } => {
            json!({ "codeExecutionResult": { "outcome": outcome, "output": output } })
        }
        Part::InlineData { mime_type, data } => {
            json!({ "inlineData": { "mimeType": mime_type, "data": BASE64.encode(data) } })
        }
        Part::FileData {
            mime_type,
            file_uri,
        } => json!({ "fileData": { "mimeType": mime_type, "fileUri": file_uri } }),
    }
}

/// Walk `candidates[0].content.parts` into typed parts
pub(crate) fn parse_response(data: Value) -> Result<GenerateResponse> {
    let wire: WireResponse =
        serde_json::from_value(data).map_err(|e| LLMError::ParseError(e.to_string()))?;

    let candidate = match wire.candidates.into_iter().next() {
        Some(candidate) => candidate,
        None => {
            let reason = wire
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map(|r| format!(" (blocked: {})", r))
                .unwrap_or_default();
            return Err(LLMError::ParseError(format!(
                "No candidates in response{}",
                reason
            )));
        }
    };

    let content = candidate.content.ok_or_else(|| {
        LLMError::ParseError(format!(
            "No content in candidate (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        ))
    })?;

    let mut parts = Vec::with_capacity(content.parts.len());
    for part in content.parts {
        if let Some(code) = part.executable_code {
            parts.push(Part::ExecutableCode {
                language: code.language,
                code: code.code,
            });
        } else if let Some(result) = part.code_execution_result {
            parts.push(Part::CodeExecutionResult {
                outcome: result.outcome,
                output: result.output,
            });
        } else if let Some(blob) = part.inline_data {
            let data = BASE64
                .decode(blob.data.as_bytes())
                .map_err(|e| LLMError::ParseError(format!("Invalid inline data: {}", e)))?;
            parts.push(Part::InlineData {
                mime_type: blob.mime_type,
                data,
            });
        } else if let Some(file) = part.file_data {
            parts.push(Part::FileData {
                mime_type: file.mime_type,
                file_uri: file.file_uri,
            });
        } else if let Some(text) = part.text {
            parts.push(Part::Text(text));
        }
    }

    Ok(GenerateResponse::new(parts))
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(map_status_error(status.as_u16(), &body))
}

pub(crate) fn map_status_error(status: u16, body: &str) -> LLMError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| body.to_string());
    let message = secrets::scrub(&message);

    match status {
        429 => LLMError::RateLimitExceeded,
        _ if body.contains("RESOURCE_EXHAUSTED") => LLMError::RateLimitExceeded,
        400 | 404 => LLMError::InvalidRequest(message),
        401 | 403 => LLMError::AuthenticationFailed(message),
        _ => LLMError::ProviderUnavailable(format!("Gemini API error ({}): {}", status, message)),
    }
}

/// MIME type for an upload, inferred from the file extension
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "mpeg" | "mpg" => "video/mpeg",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "txt" | "md" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    prompt_feedback: Option<WirePromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    content: Option<WireContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireContent {
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    text: Option<String>,
    executable_code: Option<WireExecutableCode>,
    code_execution_result: Option<WireCodeExecutionResult>,
    inline_data: Option<WireBlob>,
    file_data: Option<WireFileData>,
}

#[derive(Debug, Deserialize)]
struct WireExecutableCode {
    #[serde(default)]
    language: String,
    #[serde(default)]
    code: String,
}

#[derive(Debug, Deserialize)]
struct WireCodeExecutionResult {
    #[serde(default)]
    outcome: String,
    #[serde(default)]
    output: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBlob {
    #[serde(default)]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFileData {
    #[serde(default)]
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Deserialize)]
struct WireUploadResponse {
    file: WireFile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFile {
    name: String,
    #[serde(default)]
    uri: String,
    mime_type: Option<String>,
    #[serde(default)]
    state: String,
}

impl WireFile {
    fn into_uploaded(self, fallback_mime: &str) -> UploadedFile {
        UploadedFile {
            state: FileState::from_wire(&self.state),
            mime_type: self.mime_type.unwrap_or_else(|| fallback_mime.to_string()),
            name: self.name,
            uri: self.uri,
        }
    }
}
