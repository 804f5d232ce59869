//! Session history
//!
//! Ordered chat turns for the current process only. The rewriter reads the
//! most recent few turns; nothing here is persisted.

use serde::Serialize;
use std::fmt;

/// Who said it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "USER"),
            Role::Assistant => write!(f, "ASSISTANT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct SessionHistory {
    turns: Vec<ChatTurn>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: &str) {
        self.turns.push(ChatTurn {
            role: Role::User,
            content: content.to_string(),
        });
    }

    pub fn push_assistant(&mut self, content: &str) {
        self.turns.push(ChatTurn {
            role: Role::Assistant,
            content: content.to_string(),
        });
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// The last `n` turns, oldest first
    pub fn recent(&self, n: usize) -> &[ChatTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// The last `n` turns as `ROLE: content` lines
    pub fn transcript(&self, n: usize) -> String {
        self.recent(n)
            .iter()
            .map(|turn| format!("{}: {}\n", turn.role, turn.content))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
