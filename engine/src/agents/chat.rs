use std::sync::Arc;

use super::{prompts, AgentResponse};
use crate::llm::{GenerateRequest, GenerativeModel};

/// General conversation, aware of the stored facts about the user
pub struct ChatAgent {
    model: Arc<dyn GenerativeModel>,
}

impl ChatAgent {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    pub async fn reply(&self, query: &str, facts: &[String]) -> AgentResponse {
        tracing::debug!("Chat reply with {} known fact(s)", facts.len());

        let request = GenerateRequest::text(format!("Reply briefly: {}", query))
            .system(prompts::chat_system(facts));

        match self.model.generate(&request).await {
            Ok(response) => AgentResponse::answer(response.text()),
            Err(e) => AgentResponse::from_error("Error", &e),
        }
    }
}
