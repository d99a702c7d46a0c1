//! Conversation message log
//!
//! Defines the turn-by-turn message history owned by a session. A freshly
//! (re)initialized log always starts with a single synthetic assistant
//! greeting turn; the only other mutations are user/assistant appends.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Greeting shown at the start of every fresh conversation
pub const GREETING: &str = "How can I help you?";

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message from the user
    User,
    /// Message from the assistant/AI
    Assistant,
}

impl Role {
    /// Convert the role to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single turn in a conversation, immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced this turn
    pub role: Role,
    /// Text content of the turn (never empty)
    pub content: String,
    /// When the turn was created (Unix timestamp)
    pub created_at: i64,
}

impl Turn {
    fn new(role: Role, content: String) -> Self {
        debug_assert!(!content.trim().is_empty(), "turn content must be non-empty");
        Self {
            role,
            content,
            created_at: Utc::now().timestamp(),
        }
    }
}

/// Ordered history of turns for the active tab
///
/// Insertion order is chronological order. The log is owned exclusively
/// by its session controller; readers replay it through [`MessageLog::iter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLog {
    turns: Vec<Turn>,
}

impl MessageLog {
    /// Create a fresh log containing only the synthetic assistant greeting
    pub fn with_greeting() -> Self {
        Self {
            turns: vec![Turn::new(Role::Assistant, GREETING.to_string())],
        }
    }

    /// Append a user turn
    ///
    /// Content is validated non-empty at the API boundary before this is
    /// reached.
    pub fn append_user(&mut self, content: String) {
        self.turns.push(Turn::new(Role::User, content));
    }

    /// Append an assistant turn
    pub fn append_assistant(&mut self, content: String) {
        self.turns.push(Turn::new(Role::Assistant, content));
    }

    /// Replay the log in order without mutating it
    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// All turns in chronological order
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns in the log
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the log holds no turns
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::with_greeting()
    }
}
