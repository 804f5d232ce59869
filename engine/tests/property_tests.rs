use proptest::prelude::*;
use swarm_engine::conductor::router::normalize_label;
use swarm_engine::conductor::{DisclosureDetector, KeywordRouter, Route, RouteContext};
use swarm_engine::config::Config;
use swarm_engine::memory::Memory;
use swarm_engine::secrets::scrub;

proptest! {
    #[test]
    fn test_memory_insert_is_idempotent(facts in prop::collection::vec("[a-z ]{1,12}", 0..20)) {
        let mut memory = Memory::default();
        for fact in &facts {
            memory.insert(fact);
        }
        let snapshot = memory.clone();

        for fact in &facts {
            prop_assert!(!memory.insert(fact));
        }
        prop_assert_eq!(&memory, &snapshot);

        // no duplicates, first-seen order kept
        let mut seen = Vec::new();
        for fact in &facts {
            if !seen.contains(fact) {
                seen.push(fact.clone());
            }
        }
        prop_assert_eq!(memory.facts, seen);
    }

    #[test]
    fn test_memory_remove_after_insert(existing in prop::collection::vec("[a-z]{1,8}", 0..10), fact in "[A-Z]{1,8}") {
        let mut memory = Memory::default();
        for f in &existing {
            memory.insert(f);
        }
        let before = memory.clone();

        prop_assert!(memory.insert(&fact));
        prop_assert!(memory.remove(&fact));
        prop_assert!(!memory.remove(&fact));
        prop_assert_eq!(memory, before);
    }

    #[test]
    fn test_normalize_label_is_idempotent(raw in "[ a-zA-Z.\\n\\r]{0,20}") {
        let once = normalize_label(&raw);
        prop_assert_eq!(normalize_label(&once), once.clone());
        prop_assert!(!once.contains('.'));
        prop_assert!(!once.contains('\n'));
    }

    #[test]
    fn test_label_survives_noise(index in 0usize..5, pad in "[ \\n]{0,3}", dot in prop::bool::ANY) {
        let route = Route::ALL[index];
        let raw = format!(
            "{}{}{}{}",
            pad,
            route.label().to_lowercase(),
            if dot { "." } else { "" },
            pad
        );
        prop_assert_eq!(Route::from_label(&normalize_label(&raw)), Some(route));
    }

    #[test]
    fn test_keyword_router_respects_loaded_inputs(query in "\\PC{0,40}") {
        let router = KeywordRouter::new();
        let decision = router.decide(&query, &RouteContext::default());
        prop_assert!(decision.route != Route::Doc && decision.route != Route::Video);
        prop_assert!(!decision.is_fallback());
    }

    #[test]
    fn test_disclosure_is_case_insensitive(suffix in "[a-z ]{0,20}", upper in prop::bool::ANY) {
        let detector = DisclosureDetector::new(&Config::default().memory.triggers);
        let text = format!("my name is{}", suffix);
        let text = if upper { text.to_uppercase() } else { text };

        prop_assert_eq!(detector.detect(&text), Some(text.trim().to_string()));
    }

    #[test]
    fn test_scrub_never_leaks_google_keys(tail in "[A-Za-z0-9_-]{35}", prefix in "[a-z ]{0,10}") {
        let key = format!("AIza{}", tail);
        let text = format!("{}{} trailing", prefix, key);
        prop_assert!(!scrub(&text).contains(&key));
    }
}
