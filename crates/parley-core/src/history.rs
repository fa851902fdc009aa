//! Append-only message history shared by every agent in a group chat.
//!
//! `ChatHistory` is the owned, growing log. `HistorySnapshot` is a cheap,
//! immutable view handed to agents and strategies: taking a snapshot clones
//! an `Arc`, and a later append copies the backing vector only while a
//! snapshot is still alive, so no snapshot ever observes a mid-turn change.

use std::ops::Deref;
use std::sync::Arc;

use parley_types::message::ChatMessage;

/// Ordered, append-only log of chat messages.
#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    messages: Arc<Vec<ChatMessage>>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from previously recorded messages, in conversation order.
    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages: Arc::new(messages),
        }
    }

    /// Add a message to the end of the history.
    pub fn append(&mut self, message: ChatMessage) {
        Arc::make_mut(&mut self.messages).push(message);
    }

    /// Add a batch of messages in order.
    pub fn append_all(&mut self, messages: impl IntoIterator<Item = ChatMessage>) {
        Arc::make_mut(&mut self.messages).extend(messages);
    }

    /// The most recent message, `None` when the history is empty.
    pub fn tail(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Immutable view of the history as it is now.
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            messages: Arc::clone(&self.messages),
        }
    }

    /// View of the history as it would be after appending `pending`.
    ///
    /// The history itself is left untouched.
    pub fn snapshot_with(&self, pending: &[ChatMessage]) -> HistorySnapshot {
        if pending.is_empty() {
            return self.snapshot();
        }
        let mut messages = Vec::with_capacity(self.messages.len() + pending.len());
        messages.extend_from_slice(&self.messages);
        messages.extend_from_slice(pending);
        HistorySnapshot {
            messages: Arc::new(messages),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChatMessage> {
        self.messages.iter()
    }
}

/// Immutable, ordered view of a chat history at one point in time.
///
/// Dereferences to `[ChatMessage]`, so slice methods (`len`, `iter`, `last`,
/// indexing) are available directly.
#[derive(Debug, Clone, Default)]
pub struct HistorySnapshot {
    messages: Arc<Vec<ChatMessage>>,
}

impl HistorySnapshot {
    /// The most recent message, `None` when the snapshot is empty.
    pub fn tail(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Copy the messages out, e.g. to serialize a transcript.
    pub fn to_vec(&self) -> Vec<ChatMessage> {
        self.messages.as_ref().clone()
    }
}

impl Deref for HistorySnapshot {
    type Target = [ChatMessage];

    fn deref(&self) -> &Self::Target {
        &self.messages
    }
}

impl From<Vec<ChatMessage>> for HistorySnapshot {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages: Arc::new(messages),
        }
    }
}
