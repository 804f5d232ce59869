//! Specialist agents
//!
//! Each agent turns one query into one upstream request with its own persona
//! and capabilities, then normalises the reply. Agents never return `Err`:
//! upstream failures become an `AgentResponse` whose `failure` says what went
//! wrong and whose `text` is ready to show the user.

use serde::Serialize;

use crate::llm::LLMError;
use crate::secrets;

pub mod chat;
pub mod code;
pub mod doc;
pub mod prompts;
pub mod search;
pub mod video;

pub use chat::ChatAgent;
pub use code::CodeAgent;
pub use doc::DocAgent;
pub use search::SearchAgent;
pub use video::VideoAgent;

/// Why an agent could not produce a real answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Upstream kept rate limiting until the retry budget ran out
    RateLimited,

    /// Any other upstream error
    Upstream,

    /// The document could not be read
    Document,

    /// Upload rejected or processing ended in a failed state
    UploadFailed,

    /// Uploaded file never left the processing state
    UploadTimeout,

    /// No document or video loaded for a route that needs one
    MissingInput,
}

impl FailureKind {
    /// Classify an upstream error
    pub fn from_error(error: &LLMError) -> Self {
        match error {
            LLMError::UploadTimeout { .. } => FailureKind::UploadTimeout,
            LLMError::UploadFailed(_) => FailureKind::UploadFailed,
            LLMError::RetriesExhausted { .. } => FailureKind::RateLimited,
            e if e.is_rate_limited() => FailureKind::RateLimited,
            _ => FailureKind::Upstream,
        }
    }
}

/// An image produced by code execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl GeneratedImage {
    /// File extension matching the MIME type
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            _ => "bin",
        }
    }
}

/// The result of one agent call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AgentResponse {
    /// Text to display
    pub text: String,

    /// Images collected from the reply, in order
    pub images: Vec<GeneratedImage>,

    /// Set when `text` describes a failure rather than an answer
    pub failure: Option<FailureKind>,
}

impl AgentResponse {
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn failed(kind: FailureKind, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            images: Vec::new(),
            failure: Some(kind),
        }
    }

    /// Failure response for an upstream error, `prefix` naming the operation
    pub(crate) fn from_error(prefix: &str, error: &LLMError) -> Self {
        Self::failed(
            FailureKind::from_error(error),
            format!("{}: {}", prefix, secrets::scrub(&error.to_string())),
        )
    }

    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }
}
