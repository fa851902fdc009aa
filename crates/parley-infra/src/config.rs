//! Chat configuration loader for Parley.
//!
//! Reads a chat definition file (TOML) into [`ChatConfig`] and validates it.
//! Unlike ambient settings, a chat file is required: a missing or malformed
//! file is an error, never silently replaced by defaults.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

use parley_types::agent::name_key;
use parley_types::config::{ChatConfig, TerminationConfig};
use parley_types::llm::LlmError;

/// Errors from loading a chat configuration or assembling a chat from it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid chat configuration: {0}")]
    Invalid(String),

    #[error("provider unavailable: {0}")]
    Provider(#[source] LlmError),
}

/// Load and validate a chat configuration file.
pub async fn load_chat_config(path: &Path) -> Result<ChatConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let config = toml::from_str::<ChatConfig>(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_chat_config(&config)?;
    tracing::debug!(
        path = %path.display(),
        agents = config.agents.len(),
        maximum_iterations = config.maximum_iterations,
        "loaded chat config"
    );
    Ok(config)
}

/// Check the invariants a runnable chat needs.
///
/// - at least one agent, with distinct non-blank names (compared
///   case-insensitively, as agent lookup is)
/// - `maximum_iterations >= 1`
/// - termination settings are usable and only scope declared agents
/// - a `[provider]` table when any agent (or the judge) needs a model
pub fn validate_chat_config(config: &ChatConfig) -> Result<(), ConfigError> {
    if config.agents.is_empty() {
        return Err(ConfigError::Invalid("at least one [[agents]] entry is required".into()));
    }
    if config.maximum_iterations == 0 {
        return Err(ConfigError::Invalid("maximum_iterations must be at least 1".into()));
    }

    let mut seen = HashSet::new();
    for agent in &config.agents {
        if agent.name.trim().is_empty() {
            return Err(ConfigError::Invalid("agent names must not be empty".into()));
        }
        if !seen.insert(name_key(&agent.name)) {
            return Err(ConfigError::Invalid(format!(
                "duplicate agent name '{}'",
                agent.name
            )));
        }
    }

    for scoped in config.termination.agent_scope() {
        if !seen.contains(&name_key(scoped)) {
            return Err(ConfigError::Invalid(format!(
                "termination scope names unknown agent '{scoped}'"
            )));
        }
    }

    match &config.termination {
        TerminationConfig::Never => {}
        TerminationConfig::ContentMatch { marker, .. } => {
            if marker.trim().is_empty() {
                return Err(ConfigError::Invalid("termination marker must not be empty".into()));
            }
        }
        TerminationConfig::Threshold {
            field, threshold, ..
        } => {
            if field.trim().is_empty() {
                return Err(ConfigError::Invalid("threshold field must not be empty".into()));
            }
            if !threshold.is_finite() {
                return Err(ConfigError::Invalid("threshold must be a finite number".into()));
            }
        }
        TerminationConfig::Judge { goal, .. } => {
            if goal.trim().is_empty() {
                return Err(ConfigError::Invalid("judge goal must not be empty".into()));
            }
        }
    }

    if config.provider.is_none() && needs_provider(config) {
        return Err(ConfigError::Invalid(
            "a [provider] table is required for agents without a script and for judge termination"
                .into(),
        ));
    }

    Ok(())
}

/// Whether running this chat calls a model.
pub fn needs_provider(config: &ChatConfig) -> bool {
    matches!(config.termination, TerminationConfig::Judge { .. })
        || config.agents.iter().any(|a| a.script.is_none())
}
