//! Generative model abstraction layer
//!
//! Every agent, the rewriter, the router and the judge talk to the hosted
//! generative API through the `GenerativeModel` trait. A request carries
//! content parts, an optional persona instruction and optional capability
//! declarations; a response is an ordered list of typed parts that callers
//! walk to separate prose from code, execution output and inline images.

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub mod gemini;
pub mod retry;

/// Result type for model operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur while talking to the model
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded (429 RESOURCE_EXHAUSTED)")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("File {name} still processing after {waited:?}")]
    UploadTimeout { name: String, waited: Duration },

    #[error("Still rate limited after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl LLMError {
    /// Whether this error is an upstream overload signal worth retrying.
    ///
    /// Besides the typed variant, any error text carrying the HTTP status
    /// or the `RESOURCE_EXHAUSTED` code counts.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            LLMError::RateLimitExceeded => true,
            LLMError::RetriesExhausted { .. } | LLMError::UploadTimeout { .. } => false,
            other => {
                let text = other.to_string();
                text.contains("429") || text.contains("RESOURCE_EXHAUSTED")
            }
        }
    }
}

/// Auxiliary tool the service may use while answering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Ground the answer in web search results
    WebSearch,

    /// Run generated code in the service's sandbox
    CodeExecution,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::WebSearch => write!(f, "web_search"),
            Capability::CodeExecution => write!(f, "code_execution"),
        }
    }
}

/// One piece of request or response content
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    /// Plain prose
    Text(String),

    /// Code the model generated for the sandbox
    ExecutableCode { language: String, code: String },

    /// Output of running that code
    CodeExecutionResult { outcome: String, output: String },

    /// Inline binary payload (plots)
    InlineData { mime_type: String, data: Vec<u8> },

    /// Reference to an uploaded file
    FileData { mime_type: String, file_uri: String },
}

impl Part {
    pub fn text(content: impl Into<String>) -> Self {
        Part::Text(content.into())
    }

    /// Reference an uploaded file as request content
    pub fn file(file: &UploadedFile) -> Self {
        Part::FileData {
            mime_type: file.mime_type.clone(),
            file_uri: file.uri.clone(),
        }
    }
}

/// A single generateContent call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateRequest {
    /// Persona / system instruction
    pub system_instruction: Option<String>,

    /// User content, in order
    pub parts: Vec<Part>,

    /// Tools the service may use
    pub capabilities: Vec<Capability>,
}

impl GenerateRequest {
    /// Request with a single text part
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::text(prompt)],
            ..Self::default()
        }
    }

    /// Request with the given parts
    pub fn with_parts(parts: Vec<Part>) -> Self {
        Self {
            parts,
            ..Self::default()
        }
    }

    pub fn system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn capability(mut self, capability: Capability) -> Self {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    /// Concatenated text parts, used for logging and by test doubles
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Model reply: the first candidate's parts, in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateResponse {
    pub parts: Vec<Part>,
}

impl GenerateResponse {
    pub fn new(parts: Vec<Part>) -> Self {
        Self { parts }
    }

    /// Response holding a single text part
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::text(text)],
        }
    }

    /// All text parts concatenated
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Processing state of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Processing,
    Active,
    Failed,
    Unspecified,
}

impl FileState {
    /// Parse the wire state name; unknown names map to `Unspecified`
    pub fn from_wire(state: &str) -> Self {
        match state {
            "PROCESSING" => FileState::Processing,
            "ACTIVE" => FileState::Active,
            "FAILED" => FileState::Failed,
            _ => FileState::Unspecified,
        }
    }
}

/// Handle to a file stored by the service
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    /// Resource name, e.g. `files/abc123`
    pub name: String,

    /// URI used to reference the file in requests
    pub uri: String,

    pub mime_type: String,

    pub state: FileState,
}

/// Generative model trait that every backend implements
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Model or provider name, for logs
    fn name(&self) -> &str;

    /// Issue one generateContent request
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse>;

    /// Upload a local file for multimodal requests
    async fn upload_file(&self, path: &Path) -> Result<UploadedFile> {
        Err(LLMError::InvalidRequest(format!(
            "{} does not support file uploads ({})",
            self.name(),
            path.display()
        )))
    }

    /// Refresh an uploaded file's metadata
    async fn get_file(&self, name: &str) -> Result<UploadedFile> {
        Err(LLMError::InvalidRequest(format!(
            "{} does not support file lookups ({})",
            self.name(),
            name
        )))
    }
}
