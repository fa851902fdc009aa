//! LLM provider implementations.
//!
//! Contains the OpenAI-compatible implementation of the [`LlmProvider`]
//! trait defined in `parley-core`, a factory ([`create_provider`]) that
//! builds it from a chat file's `[provider]` table, and a connection probe
//! ([`test_provider_connection`]).
//!
//! [`LlmProvider`]: parley_core::llm::LlmProvider

pub mod openai_compat;

use secrecy::SecretString;
use tracing::debug;

use parley_core::llm::BoxLlmProvider;
use parley_types::config::ProviderSettings;
use parley_types::llm::{CompletionRequest, LlmError, Message};
use parley_types::message::AuthorRole;

use self::openai_compat::OpenAiCompatibleProvider;

/// Create a [`BoxLlmProvider`] from provider settings and a resolved API key.
pub fn create_provider(settings: &ProviderSettings, api_key: SecretString) -> BoxLlmProvider {
    let config = openai_compat::config::from_settings(settings, api_key);
    debug!(
        provider = %config.provider_name,
        base_url = %config.base_url,
        model = %config.model,
        "creating provider"
    );
    BoxLlmProvider::new(OpenAiCompatibleProvider::new(config))
}

/// Create a provider, reading the API key from the environment variable named
/// by `settings.api_key_env`.
///
/// # Errors
///
/// Returns `LlmError::AuthenticationFailed` if the variable is unset or empty.
pub fn create_provider_from_env(settings: &ProviderSettings) -> Result<BoxLlmProvider, LlmError> {
    let key = std::env::var(&settings.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or(LlmError::AuthenticationFailed)?;
    Ok(create_provider(settings, SecretString::from(key)))
}

/// Test provider connectivity by sending a minimal completion request.
///
/// Sends a tiny "Hello" message with a minimal token budget.
pub async fn test_provider_connection(provider: &BoxLlmProvider) -> Result<(), LlmError> {
    let request = CompletionRequest {
        model: String::new(), // Provider uses its configured default
        messages: vec![Message {
            role: AuthorRole::User,
            name: None,
            content: "Hello".to_string(),
        }],
        system: None,
        max_tokens: 10,
        temperature: Some(0.0),
        stop_sequences: None,
    };
    provider.complete(&request).await?;
    Ok(())
}
