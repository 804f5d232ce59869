//! Query routing
//!
//! A `RoutingPolicy` picks the specialist that handles a query. Both policies
//! fail open: anything they cannot place goes to general chat, and the
//! returned `RouteDecision` says why.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::llm::retry::RetryPolicy;
use crate::llm::{GenerateRequest, GenerativeModel, LLMError};
use crate::secrets;

/// Which specialist handles a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Route {
    Search,
    Doc,
    Video,
    Code,
    Chat,
}

impl Route {
    pub const ALL: [Route; 5] = [Route::Search, Route::Doc, Route::Video, Route::Code, Route::Chat];

    pub fn label(&self) -> &'static str {
        match self {
            Route::Search => "SEARCH",
            Route::Doc => "DOC",
            Route::Video => "VIDEO",
            Route::Code => "CODE",
            Route::Chat => "CHAT",
        }
    }

    /// Exact label match
    pub fn from_label(label: &str) -> Option<Route> {
        Route::ALL.into_iter().find(|r| r.label() == label)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What is loaded in the session
#[derive(Debug, Clone, Default)]
pub struct RouteContext {
    /// Display name of the loaded document
    pub document: Option<String>,

    /// Display name of the loaded video
    pub video: Option<String>,
}

impl RouteContext {
    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }
}

/// Why a policy sent the query to chat against its will
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    /// The classifier answered with something that is not a route label
    UnknownLabel(String),

    /// Still rate limited when the retry budget ran out
    RateLimited { attempts: u32 },

    /// Any other upstream failure
    Upstream(String),
}

/// How the route was chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteReason {
    /// A keyword rule fired on this trigger
    Keyword { trigger: String },

    /// No keyword rule fired
    NoKeywordMatch,

    /// The classifier returned this label
    Classified { label: String },

    /// Sent to chat after a failure
    Fallback { reason: FallbackReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDecision {
    pub route: Route,
    pub reason: RouteReason,
}

impl RouteDecision {
    fn fallback(reason: FallbackReason) -> Self {
        Self {
            route: Route::Chat,
            reason: RouteReason::Fallback { reason },
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.reason, RouteReason::Fallback { .. })
    }
}

#[async_trait]
pub trait RoutingPolicy: Send + Sync {
    fn name(&self) -> &str;

    async fn route(&self, query: &str, context: &RouteContext) -> RouteDecision;
}

/// Input a keyword rule needs before it may fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requires {
    Nothing,
    Document,
    Video,
}

struct KeywordRule {
    route: Route,
    requires: Requires,
    triggers: &'static [&'static str],
}

/// Ordered substring rules, first match wins.
///
/// Order: DOC (document loaded), VIDEO (video loaded), CODE, SEARCH, then CHAT.
pub struct KeywordRouter {
    rules: Vec<KeywordRule>,
}

impl Default for KeywordRouter {
    fn default() -> Self {
        Self {
            rules: vec![
                KeywordRule {
                    route: Route::Doc,
                    requires: Requires::Document,
                    triggers: &["pdf", "document", "summarize"],
                },
                KeywordRule {
                    route: Route::Video,
                    requires: Requires::Video,
                    triggers: &["video", "watch"],
                },
                KeywordRule {
                    route: Route::Code,
                    requires: Requires::Nothing,
                    triggers: &["code", "python", "calculate", "plot"],
                },
                KeywordRule {
                    route: Route::Search,
                    requires: Requires::Nothing,
                    triggers: &["search", "who is", "current", "president", "news"],
                },
            ],
        }
    }
}

impl KeywordRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decide(&self, query: &str, context: &RouteContext) -> RouteDecision {
        let lower = query.to_lowercase();

        for rule in &self.rules {
            let satisfied = match rule.requires {
                Requires::Nothing => true,
                Requires::Document => context.has_document(),
                Requires::Video => context.has_video(),
            };
            if !satisfied {
                continue;
            }

            if let Some(trigger) = rule.triggers.iter().find(|t| lower.contains(*t)) {
                return RouteDecision {
                    route: rule.route,
                    reason: RouteReason::Keyword {
                        trigger: trigger.to_string(),
                    },
                };
            }
        }

        RouteDecision {
            route: Route::Chat,
            reason: RouteReason::NoKeywordMatch,
        }
    }
}

#[async_trait]
impl RoutingPolicy for KeywordRouter {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn route(&self, query: &str, context: &RouteContext) -> RouteDecision {
        self.decide(query, context)
    }
}

/// Asks the model for a one-word route label
pub struct ClassifierRouter {
    model: Arc<dyn GenerativeModel>,
    retry: RetryPolicy,
}

impl ClassifierRouter {
    pub fn new(model: Arc<dyn GenerativeModel>, retry: RetryPolicy) -> Self {
        Self { model, retry }
    }
}

#[async_trait]
impl RoutingPolicy for ClassifierRouter {
    fn name(&self) -> &str {
        "classifier"
    }

    async fn route(&self, query: &str, context: &RouteContext) -> RouteDecision {
        let request = GenerateRequest::text(classifier_prompt(query, context));

        let model = self.model.as_ref();
        let request = &request;

        match self
            .retry
            .run("route", move || model.generate(request))
            .await
        {
            Ok(response) => {
                let label = normalize_label(&response.text());
                match Route::from_label(&label) {
                    Some(route) => RouteDecision {
                        route,
                        reason: RouteReason::Classified { label },
                    },
                    None => {
                        tracing::warn!("Classifier returned unknown label {:?}", label);
                        RouteDecision::fallback(FallbackReason::UnknownLabel(label))
                    }
                }
            }
            Err(LLMError::RetriesExhausted { attempts }) => {
                RouteDecision::fallback(FallbackReason::RateLimited { attempts })
            }
            Err(e) => {
                tracing::warn!("Classifier failed, falling back to chat: {}", e);
                RouteDecision::fallback(FallbackReason::Upstream(secrets::scrub(&e.to_string())))
            }
        }
    }
}

/// Upper-case, drop periods and newlines, trim
pub fn normalize_label(raw: &str) -> String {
    raw.to_uppercase()
        .chars()
        .filter(|c| *c != '.' && *c != '\n' && *c != '\r')
        .collect::<String>()
        .trim()
        .to_string()
}

fn classifier_prompt(query: &str, context: &RouteContext) -> String {
    format!(
        "You are the manager of a study swarm. Pick the specialist for the user's query.\n\
         1. SEARCH: real-time news, facts, definitions.\n\
         2. DOC: questions about the uploaded PDF ({}).\n\
         3. VIDEO: questions about the uploaded video ({}).\n\
         4. CODE: math, logic, Python code.\n\
         5. CHAT: greetings and general conversation.\n\n\
         User query: \"{}\"\n\n\
         Return ONLY one word: SEARCH, DOC, VIDEO, CODE, or CHAT.",
        context.document.as_deref().unwrap_or("none loaded"),
        context.video.as_deref().unwrap_or("none loaded"),
        query
    )
}
