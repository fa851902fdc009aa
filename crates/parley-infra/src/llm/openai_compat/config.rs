//! Configuration for OpenAI-compatible providers.
//!
//! Any endpoint that speaks the OpenAI chat completions protocol (OpenAI,
//! Mistral, Gemini's compatibility endpoint, local servers) is reached through
//! an [`OpenAiCompatConfig`] with the right base URL.

use secrecy::SecretString;

use parley_types::config::ProviderSettings;
use parley_types::llm::ProviderCapabilities;

/// Configuration for an OpenAI-compatible LLM provider.
///
/// Used to construct an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Human-readable provider name (e.g., "openai").
    pub provider_name: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    pub base_url: String,
    pub api_key: SecretString,
    /// Default model, used when a request leaves its model empty.
    pub model: String,
    pub capabilities: ProviderCapabilities,
}

/// Capabilities assumed for a generic chat completions endpoint.
pub fn default_capabilities() -> ProviderCapabilities {
    ProviderCapabilities {
        max_context_tokens: 128_000,
        max_output_tokens: 16_384,
    }
}

/// OpenAI default configuration.
///
/// Base URL: `https://api.openai.com/v1`
pub fn openai_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai".into(),
        base_url: "https://api.openai.com/v1".into(),
        api_key,
        model: model.into(),
        capabilities: default_capabilities(),
    }
}

/// Configuration from a chat file's `[provider]` table.
///
/// The provider is named after the endpoint host so logs tell endpoints apart.
pub fn from_settings(settings: &ProviderSettings, api_key: SecretString) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: provider_name_for(&settings.base_url),
        base_url: settings.base_url.trim_end_matches('/').to_string(),
        api_key,
        model: settings.model.clone(),
        capabilities: default_capabilities(),
    }
}

fn provider_name_for(base_url: &str) -> String {
    let host = base_url
        .split("://")
        .nth(1)
        .unwrap_or(base_url)
        .split(['/', ':'])
        .next()
        .unwrap_or_default();
    match host {
        "api.openai.com" => "openai".to_string(),
        "api.mistral.ai" => "mistral".to_string(),
        "generativelanguage.googleapis.com" => "gemini".to_string(),
        "" => "openai-compatible".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(base_url: &str) -> ProviderSettings {
        ProviderSettings {
            base_url: base_url.to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_tokens: 1024,
            temperature: None,
        }
    }

    #[test]
    fn test_openai_defaults() {
        let config = openai_defaults(SecretString::from("sk-test".to_string()), "gpt-4o");
        assert_eq!(config.provider_name, "openai");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.capabilities.max_output_tokens, 16_384);
    }

    #[test]
    fn test_from_settings_names_known_hosts() {
        let key = || SecretString::from("k".to_string());
        assert_eq!(from_settings(&settings("https://api.openai.com/v1"), key()).provider_name, "openai");
        assert_eq!(from_settings(&settings("https://api.mistral.ai/v1/"), key()).provider_name, "mistral");
        assert_eq!(
            from_settings(&settings("http://localhost:11434/v1"), key()).provider_name,
            "localhost"
        );
    }

    #[test]
    fn test_from_settings_trims_trailing_slash() {
        let config = from_settings(&settings("https://api.mistral.ai/v1/"), SecretString::from("k".to_string()));
        assert_eq!(config.base_url, "https://api.mistral.ai/v1");
        assert_eq!(config.model, "gpt-4o-mini");
    }
}
