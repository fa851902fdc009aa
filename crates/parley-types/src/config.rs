//! Group chat configuration types for Parley.
//!
//! `ChatConfig` represents a chat definition file (TOML) that declares the
//! roster, the selection and termination policies, the iteration budget, and
//! the LLM provider used by LLM-backed agents.

use serde::{Deserialize, Serialize};

use crate::chat::BudgetBehavior;

/// Top-level group chat definition.
///
/// All fields except `agents` have defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Upper bound on agent turns for one chat.
    #[serde(default = "default_maximum_iterations")]
    pub maximum_iterations: u32,

    /// What to do when the budget runs out before termination is satisfied.
    #[serde(default)]
    pub budget_behavior: BudgetBehavior,

    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub termination: TerminationConfig,

    /// Provider for LLM-backed agents. Not needed when every agent is scripted.
    #[serde(default)]
    pub provider: Option<ProviderSettings>,

    /// Roster, in turn order.
    #[serde(default)]
    pub agents: Vec<AgentDefinition>,
}

/// Turn budget used when neither the chat nor its termination policy sets one.
pub const DEFAULT_MAXIMUM_ITERATIONS: u32 = 99;

fn default_maximum_iterations() -> u32 {
    DEFAULT_MAXIMUM_ITERATIONS
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            maximum_iterations: default_maximum_iterations(),
            budget_behavior: BudgetBehavior::default(),
            selection: SelectionConfig::default(),
            termination: TerminationConfig::default(),
            provider: None,
            agents: Vec::new(),
        }
    }
}

/// Built-in selection policies available from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionConfig {
    /// Round-robin over roster order.
    #[default]
    Sequential,
}

/// Built-in termination policies available from configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminationConfig {
    /// Never terminate on content; the run ends at the budget.
    #[default]
    Never,

    /// Terminate when the latest message contains `marker` (case-insensitive).
    ContentMatch {
        marker: String,
        #[serde(default)]
        agents: Vec<String>,
    },

    /// Terminate when a numeric field of the latest (JSON) message passes a threshold.
    Threshold {
        #[serde(default = "default_threshold_field")]
        field: String,
        #[serde(default)]
        comparison: Comparison,
        threshold: f64,
        #[serde(default)]
        agents: Vec<String>,
    },

    /// Ask the configured provider whether `goal` has been met.
    Judge {
        goal: String,
        #[serde(default)]
        agents: Vec<String>,
    },
}

fn default_threshold_field() -> String {
    "score".to_string()
}

impl TerminationConfig {
    /// Names of the agents whose turns are evaluated. Empty means all agents.
    pub fn agent_scope(&self) -> &[String] {
        match self {
            TerminationConfig::Never => &[],
            TerminationConfig::ContentMatch { agents, .. }
            | TerminationConfig::Threshold { agents, .. }
            | TerminationConfig::Judge { agents, .. } => agents,
        }
    }
}

/// Numeric comparison used by threshold termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    #[default]
    Gte,
    Gt,
    Lte,
    Lt,
    Eq,
}

impl Comparison {
    /// Apply the comparison as `value <op> threshold`.
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Gte => value >= threshold,
            Comparison::Gt => value > threshold,
            Comparison::Lte => value <= threshold,
            Comparison::Lt => value < threshold,
            Comparison::Eq => (value - threshold).abs() < f64::EPSILON,
        }
    }
}

/// Connection settings for an OpenAI-compatible provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: Option<f64>,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

/// One roster entry.
///
/// An agent with a `script` replays the scripted replies instead of calling
/// the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub extra_instructions: Option<String>,
    /// Overrides `provider.model` for this agent.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub script: Option<Vec<String>>,
}
