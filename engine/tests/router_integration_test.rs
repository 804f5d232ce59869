//! Integration tests for routing policies
//!
//! Both policies must fail open toward CHAT, and the decision must say why.

mod common;

use common::ScriptedModel;
use std::sync::Arc;
use std::time::Duration;

use swarm_engine::conductor::{
    ClassifierRouter, FallbackReason, KeywordRouter, Route, RouteContext, RouteReason,
    RoutingPolicy,
};
use swarm_engine::llm::retry::RetryPolicy;
use swarm_engine::llm::LLMError;

fn classifier(model: Arc<ScriptedModel>) -> ClassifierRouter {
    ClassifierRouter::new(model, RetryPolicy::new(3, Duration::ZERO))
}

#[tokio::test]
async fn test_classifier_normalises_label() {
    let model = Arc::new(ScriptedModel::new().reply(" code.\n"));
    let decision = classifier(model)
        .route("What is 17 * 23?", &RouteContext::default())
        .await;

    assert_eq!(decision.route, Route::Code);
    assert_eq!(
        decision.reason,
        RouteReason::Classified {
            label: "CODE".into()
        }
    );
}

#[tokio::test]
async fn test_classifier_unknown_label_falls_back_to_chat() {
    let model = Arc::new(ScriptedModel::new().reply("I think this is about weather"));
    let decision = classifier(model)
        .route("What's the weather?", &RouteContext::default())
        .await;

    assert_eq!(decision.route, Route::Chat);
    assert!(decision.is_fallback());
    assert!(matches!(
        decision.reason,
        RouteReason::Fallback {
            reason: FallbackReason::UnknownLabel(_)
        }
    ));
}

#[tokio::test]
async fn test_classifier_error_falls_back_to_chat() {
    let model = Arc::new(ScriptedModel::new().fail(LLMError::AuthenticationFailed("bad key".into())));
    let decision = classifier(model.clone())
        .route("hello", &RouteContext::default())
        .await;

    assert_eq!(decision.route, Route::Chat);
    assert!(matches!(
        decision.reason,
        RouteReason::Fallback {
            reason: FallbackReason::Upstream(_)
        }
    ));
    assert_eq!(model.request_count(), 1);
}

#[tokio::test]
async fn test_classifier_rate_limit_exhaustion_falls_back() {
    let model = Arc::new(
        ScriptedModel::new()
            .fail(LLMError::RateLimitExceeded)
            .fail(LLMError::RateLimitExceeded)
            .fail(LLMError::RateLimitExceeded),
    );
    let decision = classifier(model.clone())
        .route("latest news", &RouteContext::default())
        .await;

    assert_eq!(decision.route, Route::Chat);
    assert_eq!(
        decision.reason,
        RouteReason::Fallback {
            reason: FallbackReason::RateLimited { attempts: 3 }
        }
    );
    assert_eq!(model.request_count(), 3);
}

#[tokio::test]
async fn test_classifier_retries_then_routes() {
    let model = Arc::new(
        ScriptedModel::new()
            .fail(LLMError::RateLimitExceeded)
            .reply("SEARCH"),
    );
    let decision = classifier(model.clone())
        .route("latest news", &RouteContext::default())
        .await;

    assert_eq!(decision.route, Route::Search);
    assert_eq!(model.request_count(), 2);
}

#[tokio::test]
async fn test_classifier_prompt_mentions_loaded_files() {
    let model = Arc::new(ScriptedModel::new().reply("DOC"));
    let context = RouteContext {
        document: Some("thermo.pdf".into()),
        video: Some("lecture.mp4".into()),
    };

    classifier(model.clone()).route("explain chapter 2", &context).await;

    let prompt = model.last_request().unwrap().prompt_text();
    assert!(prompt.contains("thermo.pdf"));
    assert!(prompt.contains("lecture.mp4"));
    assert!(prompt.contains("SEARCH, DOC, VIDEO, CODE, or CHAT"));
}

#[tokio::test]
async fn test_keyword_summarize_wins_with_document_loaded() {
    let context = RouteContext {
        document: Some("notes.pdf".into()),
        video: None,
    };
    let decision = KeywordRouter::new()
        .route(
            "summarize this and search the current news with python code",
            &context,
        )
        .await;

    assert_eq!(decision.route, Route::Doc);
}

#[tokio::test]
async fn test_keyword_falls_through_to_chat() {
    let decision = KeywordRouter::new()
        .route("What's the weather?", &RouteContext::default())
        .await;

    assert_eq!(decision.route, Route::Chat);
    assert_eq!(decision.reason, RouteReason::NoKeywordMatch);
    assert!(!decision.is_fallback());
}
