//! Error types for selection, agent turns, termination judging, and chat runs.

use thiserror::Error;

use crate::llm::LlmError;

/// Errors from choosing the next agent.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("agent roster is empty")]
    EmptyRoster,

    #[error("no eligible agent: {reason}")]
    NoEligibleAgent { reason: String },
}

/// Errors raised by an agent while producing its reply.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent invocation failed: {0}")]
    Invocation(String),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Errors from a termination judge. Never fatal to a chat run.
#[derive(Debug, Clone, Error)]
pub enum JudgeError {
    #[error("judge transport error: {0}")]
    Transport(String),

    #[error("judge verdict could not be parsed: {0}")]
    Parse(String),
}

/// Errors from roster membership changes.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("agent '{0}' is already in the roster")]
    DuplicateAgent(String),
}

/// Errors that end a group chat invocation.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("agent selection failed: {0}")]
    Selection(#[from] SelectionError),

    #[error("agent '{agent}' failed: {source}")]
    AgentInvocation {
        agent: String,
        #[source]
        source: AgentError,
    },

    #[error("chat invocation cancelled")]
    Cancelled,

    #[error("another invocation is already running on this chat")]
    RunInProgress,
}
