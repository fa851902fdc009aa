//! `parley check`: validate a chat file and describe what it would run.

use std::path::Path;

use anyhow::{Result, bail};
use console::style;

use parley_infra::assembly::build_group_chat;
use parley_infra::config::load_chat_config;
use parley_infra::llm::{create_provider_from_env, test_provider_connection};

/// Load, validate, and assemble the chat without running it.
pub async fn check_chat(path: &Path, probe: bool, json: bool) -> Result<()> {
    let config = load_chat_config(path).await?;
    let chat = build_group_chat(&config, None)?;

    let probe_result = match (&config.provider, probe) {
        (Some(settings), true) => {
            let provider = create_provider_from_env(settings)?;
            Some(test_provider_connection(&provider).await.map_err(|e| e.to_string()))
        }
        (None, true) => bail!("--probe needs a [provider] table in {}", path.display()),
        (_, false) => None,
    };

    if json {
        let agents: Vec<_> = chat
            .roster()
            .iter()
            .map(|agent| {
                serde_json::json!({
                    "id": agent.info().id,
                    "name": agent.info().name,
                    "description": agent.info().description,
                })
            })
            .collect();
        let report = serde_json::json!({
            "agents": agents,
            "selection": chat.selection_name(),
            "termination": chat.termination().strategy_name(),
            "termination_scope": chat.termination().agent_scope(),
            "maximum_iterations": chat.maximum_iterations(),
            "budget_behavior": config.budget_behavior,
            "provider_ok": probe_result.as_ref().map(Result::is_ok),
            "provider_error": probe_result.as_ref().and_then(|r| r.as_ref().err()),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {} is valid",
        style("✓").green().bold(),
        style(path.display()).cyan()
    );
    println!();
    for (position, agent) in chat.roster().iter().enumerate() {
        let info = agent.info();
        match &info.description {
            Some(description) => println!(
                "  {}. {}  {}",
                position + 1,
                style(info.author_identity()).bold(),
                style(description).dim()
            ),
            None => println!("  {}. {}", position + 1, style(info.author_identity()).bold()),
        }
    }
    println!();
    println!("  {}  {}", style("Selection:").bold(), chat.selection_name());
    let scope = chat.termination().agent_scope();
    if scope.is_empty() {
        println!("  {}  {}", style("Termination:").bold(), chat.termination().strategy_name());
    } else {
        println!(
            "  {}  {} (judged after {})",
            style("Termination:").bold(),
            chat.termination().strategy_name(),
            scope.join(", ")
        );
    }
    println!(
        "  {}  {} turns, then {}",
        style("Budget:").bold(),
        chat.maximum_iterations(),
        config.budget_behavior
    );
    if let Some(result) = probe_result {
        match result {
            Ok(()) => println!("  {} Provider reachable", style("✓").green()),
            Err(e) => println!("  {} Provider unreachable: {e}", style("✗").red()),
        }
    }
    println!();
    Ok(())
}
