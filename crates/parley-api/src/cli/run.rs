//! `parley run`: drive a group chat from a chat file and print each turn.

use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use parley_core::chat::GroupChat;
use parley_core::event::EventBus;
use parley_infra::assembly::build_group_chat;
use parley_infra::config::load_chat_config;
use parley_types::error::ChatError;
use parley_types::event::ChatEvent;
use parley_types::message::{AuthorRole, ChatMessage};

use super::RunArgs;

/// Output mode shared by the turn printer and the event watcher.
#[derive(Clone)]
struct Output {
    json: bool,
    quiet: bool,
    spinner: Option<ProgressBar>,
}

impl Output {
    fn new(json: bool, quiet: bool) -> Self {
        let spinner = (!json && !quiet).then(|| {
            let spinner = ProgressBar::new_spinner();
            if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
                spinner.set_style(template);
            }
            spinner.set_message("Starting chat...");
            spinner.enable_steady_tick(Duration::from_millis(80));
            spinner
        });
        Self {
            json,
            quiet,
            spinner,
        }
    }

    /// Print above the spinner without tearing it.
    fn line(&self, text: String) {
        match &self.spinner {
            Some(spinner) => spinner.suspend(|| println!("{text}")),
            None => println!("{text}"),
        }
    }

    fn message(&self, message: &ChatMessage) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(message)?);
        } else if !self.quiet {
            let author = match message.role {
                AuthorRole::User => style(message.author_or_default()).yellow().bold(),
                _ => style(message.author_or_default()).cyan().bold(),
            };
            self.line(format!("\n  {author}\n  {}", message.content.replace('\n', "\n  ")));
        }
        Ok(())
    }

    fn finish(&self) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_and_clear();
        }
    }
}

/// Run the chat described by `args.config`.
pub async fn run_chat(args: RunArgs, json: bool, quiet: bool) -> Result<()> {
    let config = load_chat_config(&args.config).await?;
    let bus = EventBus::default();
    let mut chat = build_group_chat(&config, Some(bus.clone()))?;

    if let Some(max) = args.max_iterations {
        chat.set_maximum_iterations(max);
    }
    for seed in &args.seed {
        chat.seed(seed.clone());
    }
    if let Some(path) = &args.seed_file {
        let seed = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        chat.seed(seed.trim_end().to_string());
    }

    let output = Output::new(json, quiet);
    for message in chat.history().iter() {
        output.message(message)?;
    }

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });
    let watcher = tokio::spawn(watch_events(bus.subscribe(), output.clone()));

    let mut extension = args.extend;
    let failure = loop {
        if let Some(err) = drive(&mut chat, &cancel, &output).await? {
            break Some(err);
        }
        match extension.take() {
            Some(extra) if chat.is_paused() => {
                debug!(extra, "extending paused chat");
                chat.set_maximum_iterations(chat.maximum_iterations().saturating_add(extra));
            }
            _ => break None,
        }
    };

    interrupt.abort();
    watcher.abort();
    output.finish();

    if let Some(path) = &args.transcript {
        let transcript = serde_json::to_string_pretty(&chat.snapshot().to_vec())?;
        tokio::fs::write(path, transcript)
            .await
            .with_context(|| format!("failed to write transcript {}", path.display()))?;
    }

    print_summary(&chat, failure.as_ref(), json, quiet)?;

    match failure {
        None | Some(ChatError::Cancelled) => Ok(()),
        Some(err) => Err(err.into()),
    }
}

/// Run until the stream ends. Returns the error that ended it, if any.
async fn drive(
    chat: &mut GroupChat,
    cancel: &CancellationToken,
    output: &Output,
) -> Result<Option<ChatError>> {
    let mut stream = std::pin::pin!(chat.run(cancel.clone()));
    while let Some(item) = stream.next().await {
        match item {
            Ok(message) => output.message(&message)?,
            Err(err) => return Ok(Some(err)),
        }
    }
    Ok(None)
}

async fn watch_events(mut events: broadcast::Receiver<ChatEvent>, output: Output) {
    loop {
        match events.recv().await {
            Ok(ChatEvent::TurnStarted {
                iteration, agent, ..
            }) => {
                if let Some(spinner) = &output.spinner {
                    spinner.set_message(format!("Turn {}: {agent} is responding...", iteration + 1));
                }
            }
            Ok(ChatEvent::TerminationJudgeFailed { agent, error, .. }) if !output.json && !output.quiet => {
                output.line(format!(
                    "  {} termination check after {agent} failed: {error}",
                    style("!").yellow().bold()
                ));
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => debug!(skipped, "event watcher lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_summary(
    chat: &GroupChat,
    failure: Option<&ChatError>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    if json {
        let summary = serde_json::json!({
            "chat_id": chat.id(),
            "state": chat.run_state(),
            "messages": chat.history().len(),
            "diagnostics": chat.diagnostics().len(),
            "error": failure.map(ToString::to_string),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    if quiet {
        return Ok(());
    }

    println!();
    match failure {
        Some(ChatError::Cancelled) => {
            println!("  {} Interrupted", style("■").yellow().bold());
        }
        Some(err) => {
            println!("  {} {err}", style("✗").red().bold());
        }
        None if chat.is_paused() => {
            println!(
                "  {} Paused at the turn budget (rerun with --extend to continue)",
                style("‖").yellow().bold()
            );
        }
        None => {
            println!("  {} Chat {}", style("✓").green().bold(), chat.status());
        }
    }
    println!(
        "  {}  {}/{}",
        style("Turns:").bold(),
        chat.iteration_count(),
        chat.maximum_iterations()
    );
    if !chat.diagnostics().is_empty() {
        println!(
            "  {}  {}",
            style("Judge failures:").bold(),
            chat.diagnostics().len()
        );
    }
    println!();
    Ok(())
}
