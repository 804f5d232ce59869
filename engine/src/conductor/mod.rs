//! Conductor
//!
//! Runs one user turn through the pipeline, strictly in sequence:
//!
//! 1. record the user turn
//! 2. rewrite the message into a standalone query
//! 3. check for a self-disclosure; store it and (by default) acknowledge
//! 4. route the query
//! 5. dispatch to the chosen agent
//! 6. record the assistant turn, optionally judge the answer

pub mod disclosure;
pub mod evaluator;
pub mod rewriter;
pub mod router;
pub mod session;

pub use disclosure::DisclosureDetector;
pub use evaluator::{Judge, JudgeVerdict};
pub use rewriter::{QueryRewriter, Rewrite};
pub use router::{
    ClassifierRouter, FallbackReason, KeywordRouter, Route, RouteContext, RouteDecision,
    RouteReason, RoutingPolicy,
};
pub use session::{ChatTurn, Role, SessionHistory};

use sdk::errors::EngineError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::agents::{
    AgentResponse, ChatAgent, CodeAgent, DocAgent, FailureKind, SearchAgent, VideoAgent,
};
use crate::config::{Config, DisclosureSource, RoutingPolicyKind};
use crate::document::{DocumentReader, FileDocumentReader};
use crate::llm::retry::RetryPolicy;
use crate::llm::GenerativeModel;
use crate::memory::MemoryStore;

/// What happened to a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnKind {
    /// A fact was stored and routing skipped
    Remembered { fact: String },

    /// The query was routed and answered
    Answered { decision: RouteDecision },
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub rewritten: Rewrite,
    pub kind: TurnKind,
    pub response: AgentResponse,
    pub verdict: Option<JudgeVerdict>,
}

impl TurnOutcome {
    pub fn route(&self) -> Option<Route> {
        match &self.kind {
            TurnKind::Answered { decision } => Some(decision.route),
            TurnKind::Remembered { .. } => None,
        }
    }
}

pub struct Conductor {
    model: Arc<dyn GenerativeModel>,
    store: Arc<dyn MemoryStore>,
    rewriter: QueryRewriter,
    rewrite_enabled: bool,
    disclosure: DisclosureDetector,
    disclosure_source: DisclosureSource,
    short_circuit: bool,
    router: Box<dyn RoutingPolicy>,
    search: SearchAgent,
    doc: DocAgent,
    code: CodeAgent,
    video: VideoAgent,
    chat: ChatAgent,
    judge: Judge,
    judge_enabled: bool,
    history: SessionHistory,
    document: Option<PathBuf>,
    video_path: Option<PathBuf>,
}

impl Conductor {
    pub fn new(config: &Config, model: Arc<dyn GenerativeModel>, store: Arc<dyn MemoryStore>) -> Self {
        let rewrite_retry = if config.rewriter.retry_on_rate_limit {
            config.router.retry_policy()
        } else {
            RetryPolicy::once()
        };

        let router: Box<dyn RoutingPolicy> = match config.router.policy {
            RoutingPolicyKind::Keyword => Box::new(KeywordRouter::new()),
            RoutingPolicyKind::Classifier => Box::new(ClassifierRouter::new(
                Arc::clone(&model),
                config.router.retry_policy(),
            )),
        };

        Self {
            rewriter: QueryRewriter::new(
                Arc::clone(&model),
                config.rewriter.history_window,
                rewrite_retry,
            ),
            rewrite_enabled: config.rewriter.enabled,
            disclosure: DisclosureDetector::new(&config.memory.triggers),
            disclosure_source: config.memory.disclosure_source,
            short_circuit: config.memory.short_circuit,
            router,
            search: SearchAgent::new(Arc::clone(&model), config.agents.search_retry_policy()),
            doc: DocAgent::new(Arc::clone(&model), Arc::new(FileDocumentReader)),
            code: CodeAgent::new(Arc::clone(&model)),
            video: VideoAgent::new(
                Arc::clone(&model),
                config.agents.poll_interval(),
                config.agents.processing_timeout(),
            ),
            chat: ChatAgent::new(Arc::clone(&model)),
            judge: Judge::new(Arc::clone(&model), config.judge.criteria.clone()),
            judge_enabled: config.judge.enabled,
            history: SessionHistory::new(),
            document: None,
            video_path: None,
            model,
            store,
        }
    }

    /// Replace the document reader used by the doc agent
    pub fn with_document_reader(mut self, reader: Arc<dyn DocumentReader>) -> Self {
        self.doc = DocAgent::new(Arc::clone(&self.model), reader);
        self
    }

    /// Replace the routing policy
    pub fn with_router(mut self, router: Box<dyn RoutingPolicy>) -> Self {
        self.router = router;
        self
    }

    pub fn set_document(&mut self, path: Option<PathBuf>) {
        self.document = path;
    }

    pub fn set_video(&mut self, path: Option<PathBuf>) {
        self.video_path = path;
    }

    pub fn set_judge(&mut self, enabled: bool) {
        self.judge_enabled = enabled;
    }

    pub fn judge_enabled(&self) -> bool {
        self.judge_enabled
    }

    pub fn router_name(&self) -> &str {
        self.router.name()
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub async fn facts(&self) -> Vec<String> {
        self.store.load().await.facts
    }

    pub async fn forget(&self, fact: &str) -> Result<bool, EngineError> {
        self.store.delete(fact).await
    }

    pub async fn handle_turn(&mut self, input: &str) -> TurnOutcome {
        self.history.push_user(input);

        let rewritten = if self.rewrite_enabled {
            self.rewriter.rewrite(&self.history, input).await
        } else {
            Rewrite::unchanged(input)
        };

        let disclosure_text = match self.disclosure_source {
            DisclosureSource::Original => input,
            DisclosureSource::Rewritten => rewritten.query.as_str(),
        };

        if let Some(fact) = self.disclosure.detect(disclosure_text) {
            match self.store.update(&fact).await {
                Ok(inserted) => {
                    tracing::info!("Self-disclosure detected (new: {})", inserted);
                    if self.short_circuit {
                        let response = AgentResponse::answer(format!(
                            "Got it! I'll remember that: \"{}\"",
                            fact
                        ));
                        self.history.push_assistant(&response.text);
                        return TurnOutcome {
                            rewritten,
                            kind: TurnKind::Remembered { fact },
                            response,
                            verdict: None,
                        };
                    }
                }
                Err(e) => tracing::error!("Failed to store fact: {}", e),
            }
        }

        let context = RouteContext {
            document: self.document.as_deref().map(display_name),
            video: self.video_path.as_deref().map(display_name),
        };

        let decision = self.router.route(&rewritten.query, &context).await;
        tracing::info!(
            "Routing to {} via {} ({:?})",
            decision.route,
            self.router.name(),
            decision.reason
        );

        let response = self.dispatch(decision.route, &rewritten.query).await;
        self.history.push_assistant(&response.text);

        let verdict = if self.judge_enabled && response.is_ok() {
            Some(self.judge.evaluate(&rewritten.query, &response.text).await)
        } else {
            None
        };

        TurnOutcome {
            rewritten,
            kind: TurnKind::Answered { decision },
            response,
            verdict,
        }
    }

    async fn dispatch(&self, route: Route, query: &str) -> AgentResponse {
        match route {
            Route::Doc => match &self.document {
                Some(path) => self.doc.ask(path, query).await,
                None => AgentResponse::failed(FailureKind::MissingInput, "No PDF loaded."),
            },
            Route::Video => match &self.video_path {
                Some(path) => self.video.analyze(path, query).await,
                None => AgentResponse::failed(FailureKind::MissingInput, "No Video loaded."),
            },
            Route::Search => self.search.research(query).await,
            Route::Code => self.code.solve(query).await,
            Route::Chat => {
                let facts = self.facts().await;
                self.chat.reply(query, &facts).await
            }
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
