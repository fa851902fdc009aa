//! Agent selection: who speaks next.
//!
//! - `SelectionStrategy`: RPITIT trait for selection policies
//! - `BoxSelectionStrategy`: object-safe wrapper so a chat can hold any policy
//! - `SequentialSelection`: round-robin over roster order
//! - `FnSelection`: policy from a closure

pub mod func;
pub mod sequential;

pub use func::FnSelection;
pub use sequential::SequentialSelection;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parley_types::error::SelectionError;

use crate::agent::{Agent, AgentRoster};
use crate::history::HistorySnapshot;

/// Policy choosing the next agent to act.
///
/// Takes `&mut self` so policies may keep per-chat state such as a cursor.
/// A strategy instance belongs to exactly one chat.
pub trait SelectionStrategy: Send + Sync {
    /// Short policy name for logs (e.g., "sequential").
    fn name(&self) -> &str;

    /// Return exactly one agent from `roster`.
    ///
    /// Fails with `SelectionError::EmptyRoster` on an empty roster and
    /// `SelectionError::NoEligibleAgent` when no agent qualifies.
    fn select(
        &mut self,
        roster: &AgentRoster,
        history: &HistorySnapshot,
    ) -> impl Future<Output = Result<Arc<dyn Agent>, SelectionError>> + Send;
}

/// Object-safe version of [`SelectionStrategy`] with boxed futures.
pub trait SelectionStrategyDyn: Send + Sync {
    fn name(&self) -> &str;

    fn select_boxed<'a>(
        &'a mut self,
        roster: &'a AgentRoster,
        history: &'a HistorySnapshot,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn Agent>, SelectionError>> + Send + 'a>>;
}

impl<T: SelectionStrategy> SelectionStrategyDyn for T {
    fn name(&self) -> &str {
        SelectionStrategy::name(self)
    }

    fn select_boxed<'a>(
        &'a mut self,
        roster: &'a AgentRoster,
        history: &'a HistorySnapshot,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn Agent>, SelectionError>> + Send + 'a>> {
        Box::pin(self.select(roster, history))
    }
}

/// Type-erased selection strategy held by a group chat.
pub struct BoxSelectionStrategy {
    inner: Box<dyn SelectionStrategyDyn + Send + Sync>,
}

impl BoxSelectionStrategy {
    pub fn new<T: SelectionStrategy + 'static>(strategy: T) -> Self {
        Self {
            inner: Box::new(strategy),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn select(
        &mut self,
        roster: &AgentRoster,
        history: &HistorySnapshot,
    ) -> Result<Arc<dyn Agent>, SelectionError> {
        self.inner.select_boxed(roster, history).await
    }
}

impl Default for BoxSelectionStrategy {
    fn default() -> Self {
        Self::new(SequentialSelection::new())
    }
}

impl std::fmt::Debug for BoxSelectionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxSelectionStrategy")
            .field("name", &self.name())
            .finish()
    }
}
