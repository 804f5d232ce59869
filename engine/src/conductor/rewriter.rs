//! Query rewriter
//!
//! Turns a message that leans on earlier turns ("what about him?", "run that
//! code") into a standalone query. Any failure keeps the original message.

use serde::Serialize;
use std::sync::Arc;

use super::session::SessionHistory;
use crate::llm::retry::RetryPolicy;
use crate::llm::{GenerateRequest, GenerativeModel};

/// Result of a rewrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rewrite {
    /// Query used for routing and dispatch
    pub query: String,

    /// Whether the query differs from the user's message (ignoring case)
    pub changed: bool,
}

impl Rewrite {
    pub fn unchanged(message: &str) -> Self {
        Self {
            query: message.to_string(),
            changed: false,
        }
    }
}

pub struct QueryRewriter {
    model: Arc<dyn GenerativeModel>,
    window: usize,
    retry: RetryPolicy,
}

impl QueryRewriter {
    pub fn new(model: Arc<dyn GenerativeModel>, window: usize, retry: RetryPolicy) -> Self {
        Self {
            model,
            window,
            retry,
        }
    }

    /// Rewrite `message` using the last turns of `history`
    pub async fn rewrite(&self, history: &SessionHistory, message: &str) -> Rewrite {
        let prompt = rewrite_prompt(&history.transcript(self.window), message);
        let request = GenerateRequest::text(prompt);

        let model = self.model.as_ref();
        let request = &request;

        match self
            .retry
            .run("rewrite", move || model.generate(request))
            .await
        {
            Ok(response) => {
                let text = response.text();
                let query = text.trim().trim_matches('"').trim();

                if query.is_empty() {
                    tracing::debug!("Rewriter returned nothing, keeping original");
                    return Rewrite::unchanged(message);
                }

                let changed = query.to_lowercase() != message.trim().to_lowercase();
                if changed {
                    tracing::info!("Rewrote query: {:?} -> {:?}", message, query);
                }

                Rewrite {
                    query: query.to_string(),
                    changed,
                }
            }
            Err(e) => {
                tracing::warn!("Rewrite failed, using original message: {}", e);
                Rewrite::unchanged(message)
            }
        }
    }
}

fn rewrite_prompt(transcript: &str, message: &str) -> String {
    format!(
        "You are a query rewriter. Rewrite the LAST USER INPUT as a standalone question, \
         using the CHAT HISTORY.\n\n\
         CHAT HISTORY:\n{}\n\
         LAST USER INPUT: \"{}\"\n\n\
         INSTRUCTIONS:\n\
         - If the input refers to earlier messages (e.g. \"What about him?\", \"Run that code\"), \
         rewrite it to be fully explicit.\n\
         - If the input is already clear, return it exactly as is.\n\
         - Do NOT answer the question. Only rewrite it.\n\n\
         REWRITTEN QUERY:",
        transcript, message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_forbids_answering() {
        let prompt = rewrite_prompt("USER: hi\n", "what about him?");
        assert!(prompt.contains("Do NOT answer the question"));
        assert!(prompt.contains("LAST USER INPUT: \"what about him?\""));
        assert!(prompt.contains("USER: hi"));
    }
}
