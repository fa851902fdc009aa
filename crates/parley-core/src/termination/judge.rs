//! LLM-judged termination.
//!
//! Asks a model whether the conversation has met its goal. The model must
//! answer with `{"terminate": true|false}` (optionally fenced or wrapped in
//! prose).

use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span};

use parley_types::agent::AgentInfo;
use parley_types::error::JudgeError;
use parley_types::llm::{CompletionRequest, Message};
use parley_types::message::AuthorRole;

use super::TerminationStrategy;
use crate::history::HistorySnapshot;
use crate::json_result;
use crate::llm::{BoxLlmProvider, to_llm_messages};

const JUDGE_MAX_TOKENS: u32 = 128;

const VERDICT_PROMPT: &str = "Has the goal been met? Answer only with JSON: {\"terminate\": true} \
    if the conversation should stop now, otherwise {\"terminate\": false}.";

#[derive(Debug, Deserialize)]
struct Verdict {
    terminate: bool,
}

/// Termination decided by a model reading the conversation.
pub struct PromptJudgeTermination {
    provider: Arc<BoxLlmProvider>,
    model: String,
    goal: String,
}

impl PromptJudgeTermination {
    pub fn new(provider: Arc<BoxLlmProvider>, model: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            goal: goal.into(),
        }
    }

    fn build_request(&self, history: &HistorySnapshot) -> CompletionRequest {
        let mut messages = to_llm_messages(history);
        messages.push(Message {
            role: AuthorRole::User,
            name: None,
            content: VERDICT_PROMPT.to_string(),
        });

        CompletionRequest {
            model: self.model.clone(),
            messages,
            system: Some(format!(
                "You judge whether a multi-agent conversation is finished.\nGoal: {}",
                self.goal
            )),
            max_tokens: JUDGE_MAX_TOKENS.min(self.provider.capabilities().max_output_tokens),
            temperature: Some(0.0),
            stop_sequences: None,
        }
    }
}

impl TerminationStrategy for PromptJudgeTermination {
    fn name(&self) -> &str {
        "prompt_judge"
    }

    async fn should_agent_terminate(
        &self,
        agent: &AgentInfo,
        history: &HistorySnapshot,
        cancel: &CancellationToken,
    ) -> Result<bool, JudgeError> {
        let request = self.build_request(history);
        let span = info_span!(
            "gen_ai.judge",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
        );

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(JudgeError::Transport("judge cancelled".to_string()));
            }
            result = self.provider.complete(&request).instrument(span) => {
                result.map_err(|e| JudgeError::Transport(e.to_string()))?
            }
        };

        let verdict: Verdict = json_result::translate(&response.content).ok_or_else(|| {
            JudgeError::Parse(format!(
                "expected {{\"terminate\": bool}}, got: {}",
                response.content
            ))
        })?;

        debug!(
            agent = %agent.author_identity(),
            terminate = verdict.terminate,
            "judge verdict"
        );
        Ok(verdict.terminate)
    }
}

impl std::fmt::Debug for PromptJudgeTermination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptJudgeTermination")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("goal", &self.goal)
            .finish()
    }
}
