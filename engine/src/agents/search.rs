use std::sync::Arc;

use super::{prompts, AgentResponse, FailureKind};
use crate::llm::retry::RetryPolicy;
use crate::llm::{Capability, GenerateRequest, GenerativeModel, LLMError};

/// Answers with web search grounding, retrying while rate limited
pub struct SearchAgent {
    model: Arc<dyn GenerativeModel>,
    retry: RetryPolicy,
}

impl SearchAgent {
    pub fn new(model: Arc<dyn GenerativeModel>, retry: RetryPolicy) -> Self {
        Self { model, retry }
    }

    pub async fn research(&self, query: &str) -> AgentResponse {
        tracing::info!("Search agent looking up: {}", query);

        let request = GenerateRequest::text(query)
            .system(prompts::SEARCH)
            .capability(Capability::WebSearch);

        let model = self.model.as_ref();
        let request = &request;

        match self
            .retry
            .run("search", move || model.generate(request))
            .await
        {
            Ok(response) => AgentResponse::answer(response.text()),
            Err(LLMError::RetriesExhausted { attempts }) => {
                tracing::warn!("Search gave up after {} attempts", attempts);
                AgentResponse::failed(
                    FailureKind::RateLimited,
                    "Error: Search failed after maximum retries.",
                )
            }
            Err(e) => AgentResponse::from_error("Error performing search", &e),
        }
    }
}
