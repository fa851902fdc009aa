//! Group chat orchestration for Parley.
//!
//! Several agents share one append-only history. Each turn a selection
//! strategy picks who speaks, the agent replies, and a termination policy
//! decides whether the conversation is over. LLM providers are reached
//! through the `LlmProvider` trait; implementations live in `parley-infra`.

pub mod agent;
pub mod chat;
pub mod event;
pub mod history;
pub mod json_result;
pub mod llm;
pub mod selection;
pub mod termination;

pub use agent::{Agent, AgentRoster, ChatCompletionAgent, ScriptStep, ScriptedAgent};
pub use chat::{GroupChat, GroupChatBuilder, SharedGroupChat, TerminationDiagnostic};
pub use history::{ChatHistory, HistorySnapshot};
pub use selection::{FnSelection, SelectionStrategy, SequentialSelection};
pub use termination::{
    ContentMatchTermination, NeverTerminate, PromptJudgeTermination, TerminationPolicy,
    TerminationStrategy, ThresholdTermination,
};
