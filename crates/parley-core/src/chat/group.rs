//! The group chat orchestrator.
//!
//! A `GroupChat` owns the shared history and the roster, and runs turns:
//! select an agent, invoke it on a history snapshot, judge termination,
//! commit, and yield the committed messages. A turn is atomic: its messages
//! are appended together after termination has been judged, so a cancelled
//! or failed turn leaves the history and the iteration count untouched.

use std::sync::Arc;

use futures_util::{Stream, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use parley_types::chat::{BudgetBehavior, ChatRunState, ChatStatus, CompletionReason};
use parley_types::error::{AgentError, ChatError, JudgeError, RosterError};
use parley_types::event::ChatEvent;
use parley_types::message::ChatMessage;

use super::tracker::TurnTracker;
use crate::agent::{Agent, AgentRoster, AgentStream};
use crate::event::EventBus;
use crate::history::{ChatHistory, HistorySnapshot};
use crate::selection::{BoxSelectionStrategy, SelectionStrategy};
use crate::termination::{TerminationPolicy, TerminationVerdict};

/// A judge failure recorded during a run. The turn it belongs to was treated
/// as "not terminated".
#[derive(Debug, Clone)]
pub struct TerminationDiagnostic {
    /// Zero-based turn index.
    pub iteration: u32,
    pub agent: String,
    pub error: JudgeError,
}

/// Multi-agent conversation over one shared history.
///
/// Turns run strictly one after another. Both entry points take `&mut self`,
/// so a chat cannot be driven by two runs at once; use
/// [`SharedGroupChat`](super::SharedGroupChat) to share one between tasks.
#[derive(Debug)]
pub struct GroupChat {
    id: Uuid,
    history: ChatHistory,
    roster: AgentRoster,
    selection: BoxSelectionStrategy,
    termination: TerminationPolicy,
    tracker: TurnTracker,
    event_bus: Option<EventBus>,
    diagnostics: Vec<TerminationDiagnostic>,
}

impl GroupChat {
    pub fn builder() -> GroupChatBuilder {
        GroupChatBuilder::default()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Immutable view of the full history.
    pub fn snapshot(&self) -> HistorySnapshot {
        self.history.snapshot()
    }

    pub fn roster(&self) -> &AgentRoster {
        &self.roster
    }

    pub fn termination(&self) -> &TerminationPolicy {
        &self.termination
    }

    pub fn selection_name(&self) -> &str {
        self.selection.name()
    }

    pub fn run_state(&self) -> &ChatRunState {
        self.tracker.state()
    }

    pub fn status(&self) -> ChatStatus {
        self.tracker.status()
    }

    pub fn is_complete(&self) -> bool {
        self.tracker.state().is_complete()
    }

    pub fn is_paused(&self) -> bool {
        self.tracker.state().is_paused()
    }

    pub fn iteration_count(&self) -> u32 {
        self.tracker.iteration_count()
    }

    pub fn maximum_iterations(&self) -> u32 {
        self.tracker.maximum_iterations()
    }

    /// Why the chat completed, `None` while it can still run.
    pub fn completion_reason(&self) -> Option<CompletionReason> {
        self.tracker.state().completion_reason()
    }

    /// Judge failures observed since the chat was created or last reset.
    pub fn diagnostics(&self) -> &[TerminationDiagnostic] {
        &self.diagnostics
    }

    pub fn event_bus(&self) -> Option<&EventBus> {
        self.event_bus.as_ref()
    }

    /// Append a user message to start (or steer) the conversation.
    pub fn seed(&mut self, content: impl Into<String>) {
        self.add_message(ChatMessage::user(content));
    }

    /// Append a message between runs, e.g. prior history when resuming.
    pub fn add_message(&mut self, message: ChatMessage) {
        self.history.append(message);
    }

    /// Add an agent to the end of the turn order.
    pub fn add_agent(&mut self, agent: Arc<dyn Agent>) -> Result<(), RosterError> {
        self.roster.add(agent)
    }

    /// Change the turn budget. Raising it on a paused chat makes it
    /// runnable again from the current iteration count.
    pub fn set_maximum_iterations(&mut self, maximum_iterations: u32) {
        self.tracker.set_maximum_iterations(maximum_iterations);
        self.termination.set_maximum_iterations(maximum_iterations);
    }

    /// Return a completed or paused chat to idle with a fresh iteration
    /// count. The history and roster are kept.
    pub fn reset(&mut self) {
        info!(chat_id = %self.id, status = %self.status(), "resetting chat");
        self.tracker.reset();
        self.diagnostics.clear();
    }

    /// Run turns until the chat completes, pauses, or fails.
    ///
    /// Yields each committed message in order. On a completed chat the
    /// stream is empty. An `Err` item ends the stream; only fully completed
    /// turns are reflected in the history.
    pub fn run(
        &mut self,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<ChatMessage, ChatError>> + Send + '_ {
        async_stream::stream! {
            while self.ready_for_turn() {
                if cancel.is_cancelled() {
                    yield Err(ChatError::Cancelled);
                    break;
                }
                let agent = match self.select_agent().await {
                    Ok(agent) => agent,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                };
                match self.execute_turn(agent, &cancel).await {
                    Ok(messages) => {
                        for message in messages {
                            yield Ok(message);
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
    }

    /// Run a single turn.
    ///
    /// With `agent`, that agent acts without consulting (or advancing) the
    /// selection strategy; it joins the roster if it is not a member yet.
    /// Without one, the selection strategy picks as in [`run`](Self::run).
    pub fn run_one_turn(
        &mut self,
        agent: Option<Arc<dyn Agent>>,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<ChatMessage, ChatError>> + Send + '_ {
        async_stream::stream! {
            if !self.ready_for_turn() {
                return;
            }
            if cancel.is_cancelled() {
                yield Err(ChatError::Cancelled);
                return;
            }
            let agent = match agent {
                Some(agent) => {
                    self.join(&agent);
                    agent
                }
                None => match self.select_agent().await {
                    Ok(agent) => agent,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                },
            };
            match self.execute_turn(agent, &cancel).await {
                Ok(messages) => {
                    for message in messages {
                        yield Ok(message);
                    }
                }
                Err(e) => yield Err(e),
            }
        }
    }

    /// Whether a turn may start. Applies the budget behavior when the budget
    /// is found already used up.
    fn ready_for_turn(&mut self) -> bool {
        if self.tracker.can_run() {
            return true;
        }
        if let Some(status) = self.tracker.exhaust() {
            self.publish_status(status);
        }
        false
    }

    fn join(&mut self, agent: &Arc<dyn Agent>) {
        match self.roster.add(Arc::clone(agent)) {
            Ok(()) => info!(
                chat_id = %self.id,
                agent = %agent.info().author_identity(),
                "agent joined the chat"
            ),
            Err(RosterError::DuplicateAgent(_)) => {}
        }
    }

    async fn select_agent(&mut self) -> Result<Arc<dyn Agent>, ChatError> {
        let snapshot = self.history.snapshot();
        let agent = self.selection.select(&self.roster, &snapshot).await?;
        debug!(
            chat_id = %self.id,
            strategy = %self.selection.name(),
            agent = %agent.info().author_identity(),
            "agent selected"
        );
        Ok(agent)
    }

    async fn execute_turn(
        &mut self,
        agent: Arc<dyn Agent>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        let iteration = self.tracker.iteration_count();
        let info = agent.info().clone();
        let author = info.author_identity().to_string();
        let span = info_span!(
            "chat.turn",
            chat_id = %self.id,
            iteration,
            agent = %author,
            maximum_iterations = self.tracker.maximum_iterations(),
        );

        self.publish(ChatEvent::TurnStarted {
            chat_id: self.id,
            iteration,
            agent: author.clone(),
        });

        let stream = agent.invoke(self.history.snapshot(), cancel.clone());
        let produced = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                span.in_scope(|| info!("turn cancelled while the agent was running"));
                return Err(ChatError::Cancelled);
            }
            result = collect_turn(stream, &author).instrument(span.clone()) => result,
        };

        let produced = match produced {
            Ok(messages) => messages,
            Err(source) => {
                span.in_scope(|| warn!(error = %source, "agent turn failed, nothing appended"));
                self.publish(ChatEvent::TurnFailed {
                    chat_id: self.id,
                    iteration,
                    agent: author.clone(),
                    error: source.to_string(),
                });
                return Err(ChatError::AgentInvocation {
                    agent: author,
                    source,
                });
            }
        };

        // An empty turn has nothing of its own to judge; the tail belongs
        // to an earlier speaker.
        let verdict = if produced.is_empty() {
            span.in_scope(|| debug!("agent produced no messages, termination not evaluated"));
            TerminationVerdict::default()
        } else {
            let candidate = self.history.snapshot_with(&produced);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    span.in_scope(|| info!("turn cancelled during termination check"));
                    return Err(ChatError::Cancelled);
                }
                verdict = self
                    .termination
                    .should_terminate(&info, &candidate, cancel)
                    .instrument(span.clone()) => verdict,
            }
        };

        if let Some(error) = verdict.diagnostic {
            self.publish(ChatEvent::TerminationJudgeFailed {
                chat_id: self.id,
                iteration,
                agent: author.clone(),
                error: error.to_string(),
            });
            self.diagnostics.push(TerminationDiagnostic {
                iteration,
                agent: author.clone(),
                error,
            });
        }

        self.history.append_all(produced.iter().cloned());
        for message in &produced {
            self.publish(ChatEvent::MessageAppended {
                chat_id: self.id,
                message_id: message.id,
                author: message.author.clone(),
            });
        }

        let status = self.tracker.record_turn(verdict.terminate);
        span.in_scope(|| {
            info!(
                messages = produced.len(),
                terminate = verdict.terminate,
                status = %status,
                "turn complete"
            )
        });
        self.publish_status(status);

        Ok(produced)
    }

    fn publish_status(&self, status: ChatStatus) {
        match status {
            ChatStatus::Complete { reason } => {
                info!(
                    chat_id = %self.id,
                    reason = %reason,
                    iteration_count = self.tracker.iteration_count(),
                    "chat complete"
                );
                self.publish(ChatEvent::ChatCompleted {
                    chat_id: self.id,
                    reason,
                    iteration_count: self.tracker.iteration_count(),
                });
            }
            ChatStatus::Paused => {
                info!(
                    chat_id = %self.id,
                    iteration_count = self.tracker.iteration_count(),
                    maximum_iterations = self.tracker.maximum_iterations(),
                    "iteration budget reached, chat paused"
                );
                self.publish(ChatEvent::ChatPaused {
                    chat_id: self.id,
                    iteration_count: self.tracker.iteration_count(),
                    maximum_iterations: self.tracker.maximum_iterations(),
                });
            }
            ChatStatus::Idle | ChatStatus::Running => {}
        }
    }

    fn publish(&self, event: ChatEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

/// Drain an agent's turn, stamping every message with the agent's identity.
async fn collect_turn(stream: AgentStream, author: &str) -> Result<Vec<ChatMessage>, AgentError> {
    stream
        .map_ok(|mut message| {
            message.author = Some(author.to_string());
            message
        })
        .try_collect()
        .await
}

/// Builder for [`GroupChat`].
#[derive(Default)]
pub struct GroupChatBuilder {
    agents: Vec<Arc<dyn Agent>>,
    selection: Option<BoxSelectionStrategy>,
    termination: Option<TerminationPolicy>,
    maximum_iterations: Option<u32>,
    budget_behavior: BudgetBehavior,
    history: ChatHistory,
    event_bus: Option<EventBus>,
}

impl GroupChatBuilder {
    pub fn agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn agents(mut self, agents: impl IntoIterator<Item = Arc<dyn Agent>>) -> Self {
        self.agents.extend(agents);
        self
    }

    /// Selection policy. Defaults to sequential.
    pub fn selection<S: SelectionStrategy + 'static>(mut self, strategy: S) -> Self {
        self.selection = Some(BoxSelectionStrategy::new(strategy));
        self
    }

    pub fn boxed_selection(mut self, strategy: BoxSelectionStrategy) -> Self {
        self.selection = Some(strategy);
        self
    }

    /// Termination policy. Defaults to never terminating before the budget.
    pub fn termination(mut self, policy: TerminationPolicy) -> Self {
        self.termination = Some(policy);
        self
    }

    /// Turn budget. Overrides the termination policy's own maximum.
    pub fn maximum_iterations(mut self, maximum_iterations: u32) -> Self {
        self.maximum_iterations = Some(maximum_iterations);
        self
    }

    pub fn budget_behavior(mut self, behavior: BudgetBehavior) -> Self {
        self.budget_behavior = behavior;
        self
    }

    /// Start from existing history (resuming a previous conversation).
    pub fn history(mut self, history: ChatHistory) -> Self {
        self.history = history;
        self
    }

    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Build the chat. Fails if two agents share an id.
    pub fn build(self) -> Result<GroupChat, RosterError> {
        let roster = AgentRoster::from_agents(self.agents)?;
        let mut termination = self.termination.unwrap_or_default();
        if let Some(maximum) = self.maximum_iterations {
            termination.set_maximum_iterations(maximum);
        }
        let tracker = TurnTracker::new(termination.maximum_iterations(), self.budget_behavior);

        Ok(GroupChat {
            id: Uuid::now_v7(),
            history: self.history,
            roster,
            selection: self.selection.unwrap_or_default(),
            termination,
            tracker,
            event_bus: self.event_bus,
            diagnostics: Vec::new(),
        })
    }
}

impl std::fmt::Debug for GroupChatBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupChatBuilder")
            .field("agents", &self.agents.len())
            .field("maximum_iterations", &self.maximum_iterations)
            .field("budget_behavior", &self.budget_behavior)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{ScriptStep, ScriptedAgent};
    use parley_types::agent::AgentInfo;
    use crate::termination::ContentMatchTermination;
    use futures_util::StreamExt;

    fn scripted(name: &str, replies: &[&str]) -> Arc<ScriptedAgent> {
        Arc::new(ScriptedAgent::replying(name, replies.iter().copied()))
    }

    async fn drain(
        stream: impl Stream<Item = Result<ChatMessage, ChatError>>,
    ) -> (Vec<ChatMessage>, Option<ChatError>) {
        let mut messages = Vec::new();
        let mut error = None;
        futures_util::pin_mut!(stream);
        while let Some(item) = stream.next().await {
            match item {
                Ok(message) => messages.push(message),
                Err(e) => error = Some(e),
            }
        }
        (messages, error)
    }

    #[tokio::test]
    async fn test_run_until_budget() {
        let writer = scripted("Writer", &["draft"]);
        let mut chat = GroupChat::builder()
            .agent(writer.clone())
            .maximum_iterations(3)
            .build()
            .unwrap();
        chat.seed("concept: X");

        let (messages, error) = drain(chat.run(CancellationToken::new())).await;
        assert!(error.is_none());
        assert_eq!(messages.len(), 3);
        assert_eq!(chat.history().len(), 4);
        assert_eq!(chat.iteration_count(), 3);
        assert_eq!(chat.completion_reason(), Some(CompletionReason::BudgetExhausted));
    }

    #[tokio::test]
    async fn test_author_is_stamped() {
        let agent = Arc::new(ScriptedAgent::new(
            AgentInfo::with_id("anon-1"),
            vec![ScriptStep::Reply(vec!["hi".into()])],
        ));
        let mut chat = GroupChat::builder()
            .agent(agent)
            .maximum_iterations(1)
            .build()
            .unwrap();

        let (messages, _) = drain(chat.run(CancellationToken::new())).await;
        assert_eq!(messages[0].author.as_deref(), Some("anon-1"));
    }

    #[tokio::test]
    async fn test_empty_roster_is_selection_error() {
        let mut chat = GroupChat::builder().build().unwrap();
        chat.seed("hello");

        let (messages, error) = drain(chat.run(CancellationToken::new())).await;
        assert!(messages.is_empty());
        assert!(matches!(error, Some(ChatError::Selection(_))));
        assert_eq!(chat.status(), ChatStatus::Idle);
    }

    #[tokio::test]
    async fn test_zero_budget_completes_without_turns() {
        let writer = scripted("Writer", &["draft"]);
        let mut chat = GroupChat::builder()
            .agent(writer.clone())
            .maximum_iterations(0)
            .build()
            .unwrap();

        let (messages, error) = drain(chat.run(CancellationToken::new())).await;
        assert!(messages.is_empty());
        assert!(error.is_none());
        assert_eq!(writer.invocations(), 0);
        assert_eq!(chat.completion_reason(), Some(CompletionReason::BudgetExhausted));
    }

    #[tokio::test]
    async fn test_satisfied_turn_stops_run() {
        let writer = scripted("Writer", &["draft", "final draft"]);
        let reviewer = scripted("Reviewer", &["Needs more work.", "I approve."]);
        let mut chat = GroupChat::builder()
            .agents([writer as Arc<dyn Agent>, reviewer as Arc<dyn Agent>])
            .termination(TerminationPolicy::new(ContentMatchTermination::new("approve")))
            .build()
            .unwrap();
        chat.seed("concept: X");

        let (messages, _) = drain(chat.run(CancellationToken::new())).await;
        assert_eq!(messages.len(), 4);
        assert_eq!(chat.completion_reason(), Some(CompletionReason::Satisfied));
    }

    #[tokio::test]
    async fn test_events_are_published() {
        let bus = EventBus::new(64);
        let mut rx = bus.subscribe();
        let mut chat = GroupChat::builder()
            .agent(scripted("Writer", &["draft"]))
            .maximum_iterations(1)
            .event_bus(bus)
            .build()
            .unwrap();

        drain(chat.run(CancellationToken::new())).await;

        assert!(matches!(rx.recv().await.unwrap(), ChatEvent::TurnStarted { iteration: 0, .. }));
        assert!(matches!(rx.recv().await.unwrap(), ChatEvent::MessageAppended { .. }));
        assert!(matches!(
            rx.recv().await.unwrap(),
            ChatEvent::ChatCompleted {
                reason: CompletionReason::BudgetExhausted,
                iteration_count: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_reset_makes_completed_chat_runnable() {
        let mut chat = GroupChat::builder()
            .agent(scripted("Writer", &["draft"]))
            .maximum_iterations(1)
            .build()
            .unwrap();
        drain(chat.run(CancellationToken::new())).await;
        assert!(chat.is_complete());

        chat.reset();
        assert_eq!(chat.status(), ChatStatus::Idle);
        assert_eq!(chat.iteration_count(), 0);

        let (messages, _) = drain(chat.run(CancellationToken::new())).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(chat.history().len(), 2);
    }

    #[test]
    fn test_duplicate_agents_rejected_at_build() {
        let info = AgentInfo::with_id("same");
        let result = GroupChat::builder()
            .agent(Arc::new(ScriptedAgent::new(info.clone(), Vec::new())))
            .agent(Arc::new(ScriptedAgent::new(info, Vec::new())))
            .build();
        assert!(matches!(result, Err(RosterError::DuplicateAgent(_))));
    }

    #[test]
    fn test_builder_defaults() {
        let chat = GroupChat::builder().build().unwrap();
        assert_eq!(chat.maximum_iterations(), 99);
        assert_eq!(chat.selection_name(), "sequential");
        assert_eq!(chat.termination().strategy_name(), "never");
        assert!(chat.event_bus().is_none());
    }
}
