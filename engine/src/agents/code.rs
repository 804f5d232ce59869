use std::sync::Arc;

use super::{prompts, AgentResponse, GeneratedImage};
use crate::llm::{Capability, GenerateRequest, GenerativeModel, Part};

/// Solves problems by writing and running Python in the service sandbox
pub struct CodeAgent {
    model: Arc<dyn GenerativeModel>,
}

impl CodeAgent {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    pub async fn solve(&self, problem: &str) -> AgentResponse {
        tracing::info!("Code agent solving: {}", problem);

        let request = GenerateRequest::text(problem)
            .system(prompts::CODE)
            .capability(Capability::CodeExecution);

        match self.model.generate(&request).await {
            Ok(response) => render_parts(&response.parts),
            Err(e) => AgentResponse::from_error("Error executing code", &e),
        }
    }
}

/// Render reply parts into one display string, keeping their order.
///
/// Code is fenced as python, execution output is fenced under an
/// "Execution Output" label, inline data is collected as images.
pub fn render_parts(parts: &[Part]) -> AgentResponse {
    let mut text = String::new();
    let mut images = Vec::new();

    for part in parts {
        match part {
            Part::Text(t) => text.push_str(t),
            Part::ExecutableCode { code, .. } => {
                text.push_str(&format!("\n```python\n{}\n```\n", code.trim_end()));
            }
            Part::CodeExecutionResult { output, .. } => {
                text.push_str(&format!(
                    "\n**Execution Output:**\n```\n{}\n```\n",
                    output.trim_end()
                ));
            }
            Part::InlineData { mime_type, data } => images.push(GeneratedImage {
                mime_type: mime_type.clone(),
                data: data.clone(),
            }),
            Part::FileData { file_uri, .. } => {
                tracing::debug!("Ignoring file reference in code reply: {}", file_uri);
            }
        }
    }

    if !images.is_empty() {
        tracing::debug!("Code reply carried {} image(s)", images.len());
    }

    AgentResponse {
        text: text.trim().to_string(),
        images,
        failure: None,
    }
}
