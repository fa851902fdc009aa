//! Build a runnable group chat from a chat configuration.

use std::sync::Arc;

use tracing::info;

use parley_core::agent::{Agent, ChatCompletionAgent, ScriptStep, ScriptedAgent};
use parley_core::chat::GroupChat;
use parley_core::event::EventBus;
use parley_core::llm::BoxLlmProvider;
use parley_core::selection::SequentialSelection;
use parley_core::termination::{
    ContentMatchTermination, PromptJudgeTermination, TerminationPolicy, ThresholdTermination,
};
use parley_types::agent::AgentInfo;
use parley_types::config::{
    AgentDefinition, ChatConfig, ProviderSettings, SelectionConfig, TerminationConfig,
};

use crate::config::{ConfigError, needs_provider, validate_chat_config};
use crate::llm::create_provider_from_env;

/// Provider settings paired with the provider built from them.
type Llm<'a> = (&'a ProviderSettings, Arc<BoxLlmProvider>);

/// Build a chat, creating the provider from the environment when the
/// configuration needs one.
pub fn build_group_chat(
    config: &ChatConfig,
    event_bus: Option<EventBus>,
) -> Result<GroupChat, ConfigError> {
    let provider = match (&config.provider, needs_provider(config)) {
        (Some(settings), true) => Some(Arc::new(
            create_provider_from_env(settings).map_err(ConfigError::Provider)?,
        )),
        _ => None,
    };
    build_group_chat_with_provider(config, provider, event_bus)
}

/// Build a chat with an explicit provider for LLM-backed agents and judges.
pub fn build_group_chat_with_provider(
    config: &ChatConfig,
    provider: Option<Arc<BoxLlmProvider>>,
    event_bus: Option<EventBus>,
) -> Result<GroupChat, ConfigError> {
    validate_chat_config(config)?;

    let llm: Option<Llm<'_>> = match (&config.provider, provider) {
        (Some(settings), Some(provider)) => Some((settings, provider)),
        _ => None,
    };

    let agents = config
        .agents
        .iter()
        .map(|definition| build_agent(definition, llm.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    let termination = build_termination(&config.termination, llm.as_ref())?
        .with_maximum_iterations(config.maximum_iterations);

    let mut builder = GroupChat::builder()
        .agents(agents)
        .termination(termination)
        .budget_behavior(config.budget_behavior);
    builder = match config.selection {
        SelectionConfig::Sequential => builder.selection(SequentialSelection::new()),
    };
    if let Some(bus) = event_bus {
        builder = builder.event_bus(bus);
    }

    let chat = builder
        .build()
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    info!(
        chat_id = %chat.id(),
        agents = chat.roster().len(),
        termination = %chat.termination().strategy_name(),
        maximum_iterations = chat.maximum_iterations(),
        "group chat assembled"
    );
    Ok(chat)
}

fn build_agent(
    definition: &AgentDefinition,
    llm: Option<&Llm<'_>>,
) -> Result<Arc<dyn Agent>, ConfigError> {
    let mut info = AgentInfo::named(definition.name.clone());
    if let Some(description) = &definition.description {
        info = info.with_description(description.clone());
    }

    if let Some(script) = &definition.script {
        let steps = script
            .iter()
            .map(|reply| ScriptStep::Reply(vec![reply.clone()]))
            .collect();
        return Ok(Arc::new(ScriptedAgent::new(info, steps)));
    }

    let Some((settings, provider)) = llm else {
        return Err(ConfigError::Invalid(format!(
            "agent '{}' needs a provider",
            definition.name
        )));
    };
    let model = definition
        .model
        .clone()
        .unwrap_or_else(|| settings.model.clone());
    let mut agent = ChatCompletionAgent::new(info, Arc::clone(provider), model)
        .with_max_tokens(settings.max_tokens)
        .with_temperature(settings.temperature);
    if let Some(instructions) = &definition.instructions {
        agent = agent.with_instructions(instructions.clone());
    }
    if let Some(extra) = &definition.extra_instructions {
        agent = agent.with_extra_instructions(extra.clone());
    }
    Ok(Arc::new(agent))
}

fn build_termination(
    config: &TerminationConfig,
    llm: Option<&Llm<'_>>,
) -> Result<TerminationPolicy, ConfigError> {
    let policy = match config {
        TerminationConfig::Never => TerminationPolicy::never(),
        TerminationConfig::ContentMatch { marker, .. } => {
            TerminationPolicy::new(ContentMatchTermination::new(marker.clone()))
        }
        TerminationConfig::Threshold {
            field,
            comparison,
            threshold,
            ..
        } => TerminationPolicy::new(ThresholdTermination::new(
            field.clone(),
            *comparison,
            *threshold,
        )),
        TerminationConfig::Judge { goal, .. } => {
            let Some((settings, provider)) = llm else {
                return Err(ConfigError::Invalid(
                    "judge termination needs a provider".into(),
                ));
            };
            TerminationPolicy::new(PromptJudgeTermination::new(
                Arc::clone(provider),
                settings.model.clone(),
                goal.clone(),
            ))
        }
    };
    Ok(policy.with_agent_scope(config.agent_scope().iter().cloned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use parley_types::chat::CompletionReason;
    use tokio_util::sync::CancellationToken;

    fn config(content: &str) -> ChatConfig {
        toml::from_str(content).unwrap()
    }

    const WRITER_REVIEWER: &str = r#"
maximum_iterations = 8

[termination]
kind = "content_match"
marker = "approve"
agents = ["Reviewer"]

[[agents]]
name = "Writer"
description = "Writes slogans"
script = ["Maps for the lost.", "Never lost again."]

[[agents]]
name = "Reviewer"
script = ["Needs more work.", "This looks great, I approve."]
"#;

    #[test]
    fn builds_scripted_roster() {
        let chat = build_group_chat(&config(WRITER_REVIEWER), None).unwrap();
        assert_eq!(chat.roster().len(), 2);
        assert_eq!(chat.maximum_iterations(), 8);
        assert_eq!(chat.termination().strategy_name(), "content_match");
        assert_eq!(chat.termination().agent_scope(), ["Reviewer".to_string()]);

        let writer = chat.roster().find("Writer").unwrap();
        assert_eq!(writer.info().description.as_deref(), Some("Writes slogans"));
    }

    #[tokio::test]
    async fn assembled_chat_runs_to_approval() {
        let mut chat = build_group_chat(&config(WRITER_REVIEWER), None).unwrap();
        chat.seed("concept: a map app");

        let messages: Vec<_> = chat.run(CancellationToken::new()).collect().await;
        assert_eq!(messages.len(), 4);
        assert_eq!(chat.completion_reason(), Some(CompletionReason::Satisfied));
    }

    #[test]
    fn threshold_termination_from_config() {
        let chat = build_group_chat(
            &config(
                "budget_behavior = \"pause\"\n[termination]\nkind = \"threshold\"\nthreshold = 70\n\
                 [[agents]]\nname = \"Critic\"\nscript = []\n",
            ),
            None,
        )
        .unwrap();
        assert_eq!(chat.termination().strategy_name(), "threshold");
        assert_eq!(chat.maximum_iterations(), 99);
    }

    #[tokio::test]
    async fn non_ascii_scope_accepted_by_validation_also_matches_at_runtime() {
        let cfg = config(
            "maximum_iterations = 6\n\
             [termination]\nkind = \"content_match\"\nmarker = \"approve\"\nagents = [\"éditeur\"]\n\
             [[agents]]\nname = \"Writer\"\nscript = [\"draft\"]\n\
             [[agents]]\nname = \"Éditeur\"\nscript = [\"I approve.\"]\n",
        );
        let mut chat = build_group_chat(&cfg, None).unwrap();
        chat.seed("concept: a map app");

        let messages: Vec<_> = chat.run(CancellationToken::new()).collect().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(chat.iteration_count(), 2);
        assert_eq!(chat.completion_reason(), Some(CompletionReason::Satisfied));
    }

    #[test]
    fn llm_agent_without_provider_fails() {
        let cfg = config(
            "[provider]\nmodel = \"gpt-4o-mini\"\n[[agents]]\nname = \"Writer\"\ninstructions = \"Write.\"\n",
        );
        let err = build_group_chat_with_provider(&cfg, None, None).unwrap_err();
        assert!(err.to_string().contains("needs a provider"));
    }

    #[test]
    fn invalid_config_is_rejected_before_building() {
        let err = build_group_chat(&config("maximum_iterations = 4"), None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn judge_without_api_key_reports_provider_error() {
        let cfg = config(
            "[termination]\nkind = \"judge\"\ngoal = \"slogan approved\"\n\
             [provider]\nmodel = \"gpt-4o-mini\"\napi_key_env = \"PARLEY_TEST_UNSET_KEY\"\n\
             [[agents]]\nname = \"Writer\"\nscript = [\"draft\"]\n",
        );
        let err = build_group_chat(&cfg, None).unwrap_err();
        assert!(matches!(err, ConfigError::Provider(_)));
    }

    #[test]
    fn judge_termination_uses_supplied_provider() {
        let cfg = config(
            "[termination]\nkind = \"judge\"\ngoal = \"slogan approved\"\n\
             [provider]\nmodel = \"gpt-4o-mini\"\n\
             [[agents]]\nname = \"Writer\"\nscript = [\"draft\"]\n",
        );
        let provider = crate::llm::create_provider(
            cfg.provider.as_ref().unwrap(),
            secrecy::SecretString::from("sk-test".to_string()),
        );
        let chat = build_group_chat_with_provider(&cfg, Some(Arc::new(provider)), None).unwrap();
        assert_eq!(chat.termination().strategy_name(), "prompt_judge");
    }
}
