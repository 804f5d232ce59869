//! Long-term memory of facts about the user
//!
//! A fact is a free-text string stored verbatim. Facts are unique (exact
//! string match) and kept in insertion order. Every mutation is persisted
//! immediately by the backing store.
//!
//! Two backings implement `MemoryStore`:
//! - `FileMemoryStore`: a single JSON document `{"facts": [...]}`
//! - `SqliteMemoryStore`: a `facts` table with a unique content column

use async_trait::async_trait;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{MemoryBackend, MemoryConfig};

pub mod file;
pub mod sqlite;

pub use file::FileMemoryStore;
pub use sqlite::SqliteMemoryStore;

/// The persisted record
///
/// Unknown keys (older files carried `user_name` and `preferences`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    #[serde(default)]
    pub facts: Vec<String>,
}

impl Memory {
    /// Append `fact` unless an identical string is already stored
    ///
    /// Returns `true` when the fact was added.
    pub fn insert(&mut self, fact: &str) -> bool {
        if self.facts.iter().any(|f| f == fact) {
            return false;
        }
        self.facts.push(fact.to_string());
        true
    }

    /// Remove the first exact match of `fact`
    ///
    /// Returns `true` when something was removed.
    pub fn remove(&mut self, fact: &str) -> bool {
        match self.facts.iter().position(|f| f == fact) {
            Some(index) => {
                self.facts.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// Persistent store for `Memory`
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Current record. Absent or unreadable storage yields an empty record.
    async fn load(&self) -> Memory;

    /// Add a fact if not already present, persisting on change
    async fn update(&self, fact: &str) -> Result<bool, EngineError>;

    /// Remove the first exact match of a fact, persisting on change
    async fn delete(&self, fact: &str) -> Result<bool, EngineError>;

    /// Remove every fact
    async fn clear(&self) -> Result<(), EngineError>;
}

/// Open the store selected by `memory.backend`
pub async fn open_store(config: &MemoryConfig) -> Result<Arc<dyn MemoryStore>, EngineError> {
    match config.backend {
        MemoryBackend::Json => {
            tracing::debug!("Using JSON memory store at {}", config.path.display());
            Ok(Arc::new(FileMemoryStore::new(&config.path)))
        }
        MemoryBackend::Sqlite => {
            tracing::debug!("Using SQLite memory store at {}", config.path.display());
            let store = SqliteMemoryStore::open(&config.path).await?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let mut memory = Memory::default();
        assert!(memory.insert("My name is Dana"));
        assert!(!memory.insert("My name is Dana"));
        assert_eq!(memory.facts, vec!["My name is Dana".to_string()]);
    }

    #[test]
    fn test_insert_keeps_near_duplicates() {
        let mut memory = Memory::default();
        memory.insert("I like tea");
        memory.insert("i like tea");
        assert_eq!(memory.facts.len(), 2);
    }

    #[test]
    fn test_remove_first_match_only() {
        let mut memory = Memory {
            facts: vec!["a".into(), "b".into()],
        };
        assert!(memory.remove("a"));
        assert!(!memory.remove("a"));
        assert_eq!(memory.facts, vec!["b".to_string()]);
    }

    #[test]
    fn test_legacy_keys_ignored() {
        let json = r#"{"user_name": "Dana", "preferences": {}, "facts": ["I study law"]}"#;
        let memory: Memory = serde_json::from_str(json).unwrap();
        assert_eq!(memory.facts, vec!["I study law".to_string()]);
    }

    #[test]
    fn test_missing_facts_key_defaults_empty() {
        let memory: Memory = serde_json::from_str(r#"{"user_name": "Dana"}"#).unwrap();
        assert!(memory.is_empty());
    }
}
