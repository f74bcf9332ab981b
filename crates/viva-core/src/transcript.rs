//! Transcript: the ordered turns replayed to the completion service.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message. Serializes to exactly `{"role": ..., "content": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Append-only list of turns whose first entry is always the system seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn seeded(system_instruction: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::new(Role::System, system_instruction)],
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::new(Role::User, content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::new(Role::Assistant, content));
    }

    /// Drop everything after the seed turn.
    pub fn truncate_to_seed(&mut self) {
        self.turns.truncate(1);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn seed(&self) -> &Turn {
        &self.turns[0]
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Never true: the seed turn cannot be removed.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
