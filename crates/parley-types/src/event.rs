//! Event types for the Parley chat event bus.
//!
//! `ChatEvent` is broadcast while a group chat runs. All variants are
//! Clone + Send + Sync for use with tokio broadcast channels.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::CompletionReason;

/// Events emitted during a group chat run.
///
/// Used by the event bus to report turn lifecycle and diagnostics to
/// subscribers (UI, logging).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// An agent was chosen and is about to be invoked.
    TurnStarted {
        chat_id: Uuid,
        /// Zero-based index of the turn within the chat.
        iteration: u32,
        agent: String,
    },

    /// A produced message was committed to the history.
    MessageAppended {
        chat_id: Uuid,
        message_id: Uuid,
        author: Option<String>,
    },

    /// The termination judge failed; the turn was treated as "not terminated".
    TerminationJudgeFailed {
        chat_id: Uuid,
        iteration: u32,
        agent: String,
        error: String,
    },

    /// A turn failed; nothing from it was appended.
    TurnFailed {
        chat_id: Uuid,
        iteration: u32,
        agent: String,
        error: String,
    },

    /// The chat reached its terminal state.
    ChatCompleted {
        chat_id: Uuid,
        reason: CompletionReason,
        iteration_count: u32,
    },

    /// The budget ran out and the chat paused (resumable).
    ChatPaused {
        chat_id: Uuid,
        iteration_count: u32,
        maximum_iterations: u32,
    },
}
