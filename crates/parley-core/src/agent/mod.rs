//! Chat participants.
//!
//! An [`Agent`] reads the shared history and produces zero or more messages
//! per turn. The orchestrator owns ordering, authorship and commit; agents
//! only generate.

pub mod chat_completion;
pub mod roster;
pub mod scripted;

pub use chat_completion::ChatCompletionAgent;
pub use roster::AgentRoster;
pub use scripted::{ScriptStep, ScriptedAgent};

use std::fmt;
use std::pin::Pin;

use futures_util::Stream;
use tokio_util::sync::CancellationToken;

use parley_types::agent::AgentInfo;
use parley_types::error::AgentError;
use parley_types::message::ChatMessage;

use crate::history::HistorySnapshot;

/// Messages produced by a single agent turn, in order.
pub type AgentStream = Pin<Box<dyn Stream<Item = Result<ChatMessage, AgentError>> + Send + 'static>>;

/// A participant in a group chat.
///
/// `invoke` returns a boxed stream (not RPITIT) so agents of different kinds
/// can share one roster as `Arc<dyn Agent>`. The stream owns everything it
/// needs; the snapshot it receives never changes while it runs.
pub trait Agent: Send + Sync {
    fn info(&self) -> &AgentInfo;

    /// Produce this agent's messages for one turn.
    ///
    /// Implementations should stop promptly once `cancel` fires. An empty
    /// stream is a valid turn.
    fn invoke(&self, history: HistorySnapshot, cancel: CancellationToken) -> AgentStream;
}

impl fmt::Debug for dyn Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.info().id)
            .field("name", &self.info().name)
            .finish()
    }
}
