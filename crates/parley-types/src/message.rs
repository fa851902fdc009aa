//! Chat message types for Parley.
//!
//! A `ChatMessage` is one authored entry in a group chat history. Messages are
//! immutable once appended; the orchestrator stamps the producing agent's
//! identity into `author` before the message enters the shared history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Role of the party that authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorRole {
    System,
    User,
    Assistant,
    Tool,
}

impl fmt::Display for AuthorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorRole::System => write!(f, "system"),
            AuthorRole::User => write!(f, "user"),
            AuthorRole::Assistant => write!(f, "assistant"),
            AuthorRole::Tool => write!(f, "tool"),
        }
    }
}

impl FromStr for AuthorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "system" => Ok(AuthorRole::System),
            "user" => Ok(AuthorRole::User),
            "assistant" => Ok(AuthorRole::Assistant),
            "tool" => Ok(AuthorRole::Tool),
            "" => Err("message role must not be empty".to_string()),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single message in a group chat history.
///
/// `author` holds the identity (name, or id when unnamed) of the agent that
/// produced the message. Seed messages from the caller usually have no author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// UUIDv7 message ID (time-sortable).
    pub id: Uuid,
    pub role: AuthorRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Text content. May be empty.
    #[serde(default)]
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a new unauthored message.
    pub fn new(role: AuthorRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            author: None,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Shorthand for a user message, the usual way to seed a chat.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(AuthorRole::User, content)
    }

    /// Shorthand for an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(AuthorRole::Assistant, content)
    }

    /// Shorthand for a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(AuthorRole::System, content)
    }

    /// Build a message from a textual role, as read from a transcript or CLI flag.
    ///
    /// Fails when the role is empty or unknown.
    pub fn from_parts(role: &str, author: Option<String>, content: impl Into<String>) -> Result<Self, String> {
        let role: AuthorRole = role.parse()?;
        Ok(Self::new(role, content).with_author_opt(author))
    }

    /// Return this message with the author set.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    fn with_author_opt(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    /// Author name for display, `*` when the message has none.
    pub fn author_or_default(&self) -> &str {
        self.author.as_deref().unwrap_or("*")
    }
}
