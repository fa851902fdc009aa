//! LLM provider abstractions for Parley.
//!
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: object-safe wrapper for dynamic dispatch
//! - `to_llm_messages`: history to provider message conversion

pub mod box_provider;
pub mod provider;

pub use box_provider::BoxLlmProvider;
pub use provider::LlmProvider;

use parley_types::llm::Message;
use parley_types::message::ChatMessage;

/// Convert chat messages into provider messages, keeping the author as the
/// participant name so the model can tell agents apart.
pub fn to_llm_messages(messages: &[ChatMessage]) -> Vec<Message> {
    messages
        .iter()
        .map(|m| Message {
            role: m.role,
            name: m.author.clone(),
            content: m.content.clone(),
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod mock {
    use std::future::Future;
    use std::time::Duration;

    use parley_types::llm::{
        CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StopReason, Usage,
    };

    use super::LlmProvider;

    /// Provider that replies with canned text.
    pub(crate) struct MockProvider {
        capabilities: ProviderCapabilities,
        reply: Result<String, String>,
        delay: Option<Duration>,
    }

    impl MockProvider {
        pub(crate) fn replying(text: &str) -> Self {
            Self {
                capabilities: ProviderCapabilities {
                    max_context_tokens: 128_000,
                    max_output_tokens: 512,
                },
                reply: Ok(text.to_string()),
                delay: None,
            }
        }

        pub(crate) fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                ..Self::replying("")
            }
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    impl LlmProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn capabilities(&self) -> &ProviderCapabilities {
            &self.capabilities
        }

        fn complete(
            &self,
            request: &CompletionRequest,
        ) -> impl Future<Output = Result<CompletionResponse, LlmError>> + Send {
            let reply = self.reply.clone();
            let delay = self.delay;
            let model = request.model.clone();
            async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                match reply {
                    Ok(content) => Ok(CompletionResponse {
                        id: "resp-mock".to_string(),
                        content,
                        model,
                        stop_reason: StopReason::EndTurn,
                        usage: Usage {
                            input_tokens: 10,
                            output_tokens: 20,
                        },
                    }),
                    Err(message) => Err(LlmError::Provider { message }),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::message::AuthorRole;

    #[test]
    fn test_to_llm_messages_keeps_author_as_name() {
        let history = vec![
            ChatMessage::user("concept: maps"),
            ChatMessage::assistant("Lost? Never again.").with_author("Writer"),
        ];
        let messages = to_llm_messages(&history);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, AuthorRole::User);
        assert!(messages[0].name.is_none());
        assert_eq!(messages[1].name.as_deref(), Some("Writer"));
        assert_eq!(messages[1].content, "Lost? Never again.");
    }
}
