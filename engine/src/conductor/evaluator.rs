//! Response judge
//!
//! An optional second pass that asks the model to grade an answer from 1 to 5
//! against fixed criteria and explain the grade in one sentence.

use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, OnceLock};

use crate::llm::{GenerateRequest, GenerativeModel};

const EVALUATION_FAILED: &str = "Evaluation failed.";

/// The judge's grade
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JudgeVerdict {
    /// 1..=5, `None` when the judge failed or answered out of format
    pub score: Option<u8>,

    pub reason: String,

    /// Unparsed judge reply
    pub raw: String,
}

impl JudgeVerdict {
    fn failed() -> Self {
        Self {
            score: None,
            reason: EVALUATION_FAILED.to_string(),
            raw: String::new(),
        }
    }
}

pub struct Judge {
    model: Arc<dyn GenerativeModel>,
    criteria: String,
}

impl Judge {
    pub fn new(model: Arc<dyn GenerativeModel>, criteria: impl Into<String>) -> Self {
        Self {
            model,
            criteria: criteria.into(),
        }
    }

    pub async fn evaluate(&self, query: &str, response: &str) -> JudgeVerdict {
        let request = GenerateRequest::text(judge_prompt(query, response, &self.criteria));

        match self.model.generate(&request).await {
            Ok(reply) => {
                let verdict = parse_verdict(&reply.text());
                tracing::info!("Judge score: {:?}", verdict.score);
                verdict
            }
            Err(e) => {
                tracing::warn!("Judge call failed: {}", e);
                JudgeVerdict::failed()
            }
        }
    }
}

static SCORE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static REASON_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn score_pattern() -> Option<&'static Regex> {
    SCORE_PATTERN
        .get_or_init(|| Regex::new(r"(?i)SCORE:\s*\[?\s*(\d+)").ok())
        .as_ref()
}

fn reason_pattern() -> Option<&'static Regex> {
    REASON_PATTERN
        .get_or_init(|| Regex::new(r"(?im)^\s*REASON:\s*(.+?)\s*$").ok())
        .as_ref()
}

/// Parse a `SCORE: n` / `REASON: ...` reply
pub fn parse_verdict(raw: &str) -> JudgeVerdict {
    let score = score_pattern()
        .and_then(|re| re.captures(raw))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u8>().ok())
        .filter(|s| (1..=5).contains(s));

    let reason = reason_pattern()
        .and_then(|re| re.captures(raw))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_matches(|c| c == '[' || c == ']').to_string())
        .unwrap_or_else(|| raw.trim().to_string());

    JudgeVerdict {
        score,
        reason,
        raw: raw.to_string(),
    }
}

fn judge_prompt(query: &str, response: &str, criteria: &str) -> String {
    format!(
        "You are an AI quality assurance judge.\n\n\
         USER QUERY: \"{}\"\n\
         AGENT RESPONSE: \"{}\"\n\n\
         CRITERIA: {}\n\n\
         INSTRUCTIONS:\n\
         1. Rate the response on a scale of 1 to 5 (1 = wrong, 5 = perfect).\n\
         2. Give a one-sentence explanation.\n\n\
         FORMAT:\n\
         SCORE: [number]\n\
         REASON: [explanation]",
        query, response, criteria
    )
}
