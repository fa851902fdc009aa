//! Deterministic agent that replays a fixed script.
//!
//! Used for offline chats (agents declared with `script = [...]`) and for
//! exercising orchestration without a provider.

use std::sync::Mutex;

use parley_types::agent::AgentInfo;
use parley_types::error::AgentError;
use parley_types::message::ChatMessage;
use tokio_util::sync::CancellationToken;

use super::{Agent, AgentStream};
use crate::history::HistorySnapshot;

/// What a scripted agent does on one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Emit these messages, in order. An empty list is an empty turn.
    Reply(Vec<String>),
    /// Fail the turn with this message.
    Fail(String),
    /// Produce nothing until the turn is cancelled.
    Stall,
}

#[derive(Debug, Default)]
struct ScriptState {
    cursor: usize,
    observed: Vec<usize>,
}

/// Agent that walks its script one step per turn, wrapping around at the end.
///
/// An agent with an empty script takes empty turns.
#[derive(Debug)]
pub struct ScriptedAgent {
    info: AgentInfo,
    steps: Vec<ScriptStep>,
    state: Mutex<ScriptState>,
}

impl ScriptedAgent {
    pub fn new(info: AgentInfo, steps: Vec<ScriptStep>) -> Self {
        Self {
            info,
            steps,
            state: Mutex::new(ScriptState::default()),
        }
    }

    /// A named agent that sends one reply per turn.
    pub fn replying<S: Into<String>>(name: &str, replies: impl IntoIterator<Item = S>) -> Self {
        let steps = replies
            .into_iter()
            .map(|r| ScriptStep::Reply(vec![r.into()]))
            .collect();
        Self::new(AgentInfo::named(name), steps)
    }

    /// Number of turns this agent has been invoked for.
    pub fn invocations(&self) -> usize {
        self.state.lock().expect("script state lock poisoned").observed.len()
    }

    /// History length seen at each invocation, oldest first.
    pub fn observed_history_lengths(&self) -> Vec<usize> {
        self.state
            .lock()
            .expect("script state lock poisoned")
            .observed
            .clone()
    }

    fn next_step(&self, history_len: usize) -> Option<ScriptStep> {
        let mut state = self.state.lock().expect("script state lock poisoned");
        state.observed.push(history_len);
        if self.steps.is_empty() {
            return None;
        }
        let step = self.steps[state.cursor % self.steps.len()].clone();
        state.cursor += 1;
        Some(step)
    }
}

impl Agent for ScriptedAgent {
    fn info(&self) -> &AgentInfo {
        &self.info
    }

    fn invoke(&self, history: HistorySnapshot, cancel: CancellationToken) -> AgentStream {
        let step = self.next_step(history.len());
        let author = self.info.author_identity().to_string();

        Box::pin(async_stream::stream! {
            match step {
                None => {}
                Some(ScriptStep::Reply(replies)) => {
                    for reply in replies {
                        yield Ok(ChatMessage::assistant(reply).with_author(author.clone()));
                    }
                }
                Some(ScriptStep::Fail(message)) => {
                    yield Err(AgentError::Invocation(message));
                }
                Some(ScriptStep::Stall) => {
                    cancel.cancelled().await;
                    yield Err(AgentError::Invocation("turn cancelled".to_string()));
                }
            }
        })
    }
}
