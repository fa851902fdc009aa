//! Termination: when the conversation stops.
//!
//! A [`TerminationStrategy`] judges one agent turn. A [`TerminationPolicy`]
//! wraps a strategy with its agent scope and the iteration budget shared with
//! the chat, and degrades judge failures to "keep going".

pub mod content_match;
pub mod judge;
pub mod threshold;

pub use content_match::ContentMatchTermination;
pub use judge::PromptJudgeTermination;
pub use threshold::ThresholdTermination;

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use parley_types::agent::AgentInfo;
use parley_types::config::DEFAULT_MAXIMUM_ITERATIONS;
use parley_types::error::JudgeError;

use crate::history::HistorySnapshot;

/// Decides whether a chat should stop after `agent`'s turn.
///
/// `history` already contains the turn's messages. Judges that call a model
/// should stop when `cancel` fires.
pub trait TerminationStrategy: Send + Sync {
    /// Short policy name for logs (e.g., "content_match").
    fn name(&self) -> &str;

    fn should_agent_terminate(
        &self,
        agent: &AgentInfo,
        history: &HistorySnapshot,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<bool, JudgeError>> + Send;
}

/// Object-safe version of [`TerminationStrategy`] with boxed futures.
pub trait TerminationStrategyDyn: Send + Sync {
    fn name(&self) -> &str;

    fn should_agent_terminate_boxed<'a>(
        &'a self,
        agent: &'a AgentInfo,
        history: &'a HistorySnapshot,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<bool, JudgeError>> + Send + 'a>>;
}

impl<T: TerminationStrategy> TerminationStrategyDyn for T {
    fn name(&self) -> &str {
        TerminationStrategy::name(self)
    }

    fn should_agent_terminate_boxed<'a>(
        &'a self,
        agent: &'a AgentInfo,
        history: &'a HistorySnapshot,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<bool, JudgeError>> + Send + 'a>> {
        Box::pin(self.should_agent_terminate(agent, history, cancel))
    }
}

/// Type-erased termination strategy.
pub struct BoxTerminationStrategy {
    inner: Box<dyn TerminationStrategyDyn + Send + Sync>,
}

impl BoxTerminationStrategy {
    pub fn new<T: TerminationStrategy + 'static>(strategy: T) -> Self {
        Self {
            inner: Box::new(strategy),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn should_agent_terminate(
        &self,
        agent: &AgentInfo,
        history: &HistorySnapshot,
        cancel: &CancellationToken,
    ) -> Result<bool, JudgeError> {
        self.inner
            .should_agent_terminate_boxed(agent, history, cancel)
            .await
    }
}

impl std::fmt::Debug for BoxTerminationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxTerminationStrategy")
            .field("name", &self.name())
            .finish()
    }
}

/// Strategy that is never satisfied; the chat runs until its budget.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverTerminate;

impl TerminationStrategy for NeverTerminate {
    fn name(&self) -> &str {
        "never"
    }

    async fn should_agent_terminate(
        &self,
        _agent: &AgentInfo,
        _history: &HistorySnapshot,
        _cancel: &CancellationToken,
    ) -> Result<bool, JudgeError> {
        Ok(false)
    }
}

/// Outcome of evaluating a turn under a [`TerminationPolicy`].
#[derive(Debug, Clone, Default)]
pub struct TerminationVerdict {
    pub terminate: bool,
    /// Set when the judge failed and the turn was treated as not terminated.
    pub diagnostic: Option<JudgeError>,
}

/// A termination strategy together with its scope and budget.
#[derive(Debug)]
pub struct TerminationPolicy {
    strategy: BoxTerminationStrategy,
    agent_scope: Vec<String>,
    maximum_iterations: u32,
}

impl TerminationPolicy {
    pub fn new<T: TerminationStrategy + 'static>(strategy: T) -> Self {
        Self {
            strategy: BoxTerminationStrategy::new(strategy),
            agent_scope: Vec::new(),
            maximum_iterations: DEFAULT_MAXIMUM_ITERATIONS,
        }
    }

    /// Policy that only stops at the budget.
    pub fn never() -> Self {
        Self::new(NeverTerminate)
    }

    /// Only evaluate turns taken by these agents (ids or names).
    ///
    /// An empty scope evaluates every turn.
    pub fn with_agent_scope<S: Into<String>>(mut self, agents: impl IntoIterator<Item = S>) -> Self {
        self.agent_scope = agents.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_maximum_iterations(mut self, maximum_iterations: u32) -> Self {
        self.maximum_iterations = maximum_iterations;
        self
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    pub fn agent_scope(&self) -> &[String] {
        &self.agent_scope
    }

    pub fn maximum_iterations(&self) -> u32 {
        self.maximum_iterations
    }

    pub(crate) fn set_maximum_iterations(&mut self, maximum_iterations: u32) {
        self.maximum_iterations = maximum_iterations;
    }

    /// Whether turns by `agent` are evaluated at all.
    pub fn in_scope(&self, agent: &AgentInfo) -> bool {
        self.agent_scope.is_empty() || self.agent_scope.iter().any(|key| agent.matches(key))
    }

    /// Judge `agent`'s turn.
    ///
    /// Out-of-scope turns are "not yet" without consulting the strategy. A
    /// judge error yields `terminate = false` with the error as diagnostic.
    /// The budget is not applied here; the chat enforces it.
    pub async fn should_terminate(
        &self,
        agent: &AgentInfo,
        history: &HistorySnapshot,
        cancel: &CancellationToken,
    ) -> TerminationVerdict {
        if !self.in_scope(agent) {
            debug!(agent = %agent.author_identity(), "agent outside termination scope");
            return TerminationVerdict::default();
        }

        match self
            .strategy
            .should_agent_terminate(agent, history, cancel)
            .await
        {
            Ok(terminate) => TerminationVerdict {
                terminate,
                diagnostic: None,
            },
            Err(e) => {
                warn!(
                    agent = %agent.author_identity(),
                    strategy = %self.strategy.name(),
                    error = %e,
                    "termination judge failed, continuing"
                );
                TerminationVerdict {
                    terminate: false,
                    diagnostic: Some(e),
                }
            }
        }
    }
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self::never()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::message::ChatMessage;

    struct FailingJudge;

    impl TerminationStrategy for FailingJudge {
        fn name(&self) -> &str {
            "failing"
        }

        async fn should_agent_terminate(
            &self,
            _agent: &AgentInfo,
            _history: &HistorySnapshot,
            _cancel: &CancellationToken,
        ) -> Result<bool, JudgeError> {
            Err(JudgeError::Transport("connection reset".into()))
        }
    }

    fn approved() -> HistorySnapshot {
        HistorySnapshot::from(vec![ChatMessage::assistant("I approve.")])
    }

    #[tokio::test]
    async fn test_never_terminate() {
        let policy = TerminationPolicy::never();
        let verdict = policy
            .should_terminate(&AgentInfo::named("Writer"), &approved(), &CancellationToken::new())
            .await;
        assert!(!verdict.terminate);
        assert!(verdict.diagnostic.is_none());
        assert_eq!(policy.maximum_iterations(), 99);
    }

    #[tokio::test]
    async fn test_scope_short_circuits() {
        let policy = TerminationPolicy::new(ContentMatchTermination::new("approve"))
            .with_agent_scope(["Reviewer"]);
        let cancel = CancellationToken::new();

        let writer = policy
            .should_terminate(&AgentInfo::named("Writer"), &approved(), &cancel)
            .await;
        assert!(!writer.terminate);

        let reviewer = policy
            .should_terminate(&AgentInfo::named("reviewer"), &approved(), &cancel)
            .await;
        assert!(reviewer.terminate);
    }

    #[test]
    fn test_scope_folds_non_ascii_case() {
        let policy = TerminationPolicy::never().with_agent_scope(["éditeur"]);
        assert!(policy.in_scope(&AgentInfo::named("Éditeur")));
        assert!(!policy.in_scope(&AgentInfo::named("Writer")));
    }

    #[tokio::test]
    async fn test_judge_error_degrades_to_continue() {
        let policy = TerminationPolicy::new(FailingJudge);
        let verdict = policy
            .should_terminate(&AgentInfo::named("Reviewer"), &approved(), &CancellationToken::new())
            .await;
        assert!(!verdict.terminate);
        assert!(matches!(verdict.diagnostic, Some(JudgeError::Transport(_))));
    }

    #[test]
    fn test_with_maximum_iterations() {
        let policy = TerminationPolicy::never().with_maximum_iterations(8);
        assert_eq!(policy.maximum_iterations(), 8);
        assert_eq!(policy.strategy_name(), "never");
    }
}
