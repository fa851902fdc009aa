//! LLM-backed agent.
//!
//! Sends the shared history to a chat completion provider, framed by the
//! agent's instructions, and replies with the model's answer.

use std::sync::Arc;

use async_stream::try_stream;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span};

use parley_types::agent::AgentInfo;
use parley_types::error::AgentError;
use parley_types::llm::{CompletionRequest, Message};
use parley_types::message::{AuthorRole, ChatMessage};

use super::{Agent, AgentStream};
use crate::history::HistorySnapshot;
use crate::llm::{BoxLlmProvider, to_llm_messages};

const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Agent that answers each turn with one chat completion.
///
/// `instructions` become the system prompt. `extra_instructions` are sent as
/// a trailing system message after the history, which steers the next reply
/// without becoming part of the conversation.
pub struct ChatCompletionAgent {
    info: AgentInfo,
    provider: Arc<BoxLlmProvider>,
    model: String,
    instructions: Option<String>,
    extra_instructions: Option<String>,
    max_tokens: u32,
    temperature: Option<f64>,
}

impl ChatCompletionAgent {
    pub fn new(info: AgentInfo, provider: Arc<BoxLlmProvider>, model: impl Into<String>) -> Self {
        Self {
            info,
            provider,
            model: model.into(),
            instructions: None,
            extra_instructions: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_extra_instructions(mut self, extra: impl Into<String>) -> Self {
        self.extra_instructions = Some(extra.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f64>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Build the provider request for one turn over `history`.
    ///
    /// `max_tokens` is clamped to what the provider can produce.
    pub fn build_request(&self, history: &HistorySnapshot) -> CompletionRequest {
        let mut messages = to_llm_messages(history);
        if let Some(extra) = &self.extra_instructions {
            messages.push(Message {
                role: AuthorRole::System,
                name: None,
                content: extra.clone(),
            });
        }

        CompletionRequest {
            model: self.model.clone(),
            messages,
            system: self.instructions.clone(),
            max_tokens: self
                .max_tokens
                .min(self.provider.capabilities().max_output_tokens),
            temperature: self.temperature,
            stop_sequences: None,
        }
    }
}

impl Agent for ChatCompletionAgent {
    fn info(&self) -> &AgentInfo {
        &self.info
    }

    fn invoke(&self, history: HistorySnapshot, cancel: CancellationToken) -> AgentStream {
        let request = self.build_request(&history);
        let provider = Arc::clone(&self.provider);
        let author = self.info.author_identity().to_string();

        let span = info_span!(
            "gen_ai.invoke_agent",
            gen_ai.system = provider.name(),
            gen_ai.agent.name = %author,
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
        );

        Box::pin(try_stream! {
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    Err(AgentError::Invocation("cancelled while waiting for the provider".to_string()))
                }
                result = provider.complete(&request).instrument(span) => result.map_err(AgentError::from),
            }?;

            debug!(
                agent = %author,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                stop_reason = %response.stop_reason,
                "agent reply received"
            );

            yield ChatMessage::assistant(response.content).with_author(author);
        })
    }
}
