use std::path::Path;
use std::sync::Arc;

use super::{prompts, AgentResponse, FailureKind};
use crate::document::DocumentReader;
use crate::llm::{GenerateRequest, GenerativeModel};

/// Answers questions strictly from a loaded document
///
/// The whole document text is inlined into the prompt. When the reader
/// fails, its error text is returned and no request is made.
pub struct DocAgent {
    model: Arc<dyn GenerativeModel>,
    reader: Arc<dyn DocumentReader>,
}

impl DocAgent {
    pub fn new(model: Arc<dyn GenerativeModel>, reader: Arc<dyn DocumentReader>) -> Self {
        Self { model, reader }
    }

    pub async fn ask(&self, path: &Path, question: &str) -> AgentResponse {
        tracing::info!("Doc agent reading {} to answer: {}", path.display(), question);

        let reader = Arc::clone(&self.reader);
        let owned = path.to_path_buf();
        let text = match tokio::task::spawn_blocking(move || reader.read(&owned)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::warn!("Document read failed: {}", e);
                return AgentResponse::failed(FailureKind::Document, e.to_string());
            }
            Err(e) => {
                return AgentResponse::failed(
                    FailureKind::Document,
                    format!("Error reading PDF: {}", e),
                );
            }
        };

        let request =
            GenerateRequest::text(prompts::doc_prompt(&text, question)).system(prompts::DOC);

        match self.model.generate(&request).await {
            Ok(response) => AgentResponse::answer(response.text()),
            Err(e) => AgentResponse::from_error("Error processing document", &e),
        }
    }
}
