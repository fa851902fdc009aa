//! Round-robin selection over roster order.

use std::future::Future;
use std::sync::Arc;

use parley_types::error::SelectionError;

use super::SelectionStrategy;
use crate::agent::{Agent, AgentRoster};
use crate::history::HistorySnapshot;

/// Picks roster[0], roster[1], ... and wraps around.
///
/// The cursor counts selections made by this instance only, so after K
/// selections the next pick is index `K mod N`. Agents driven directly
/// (bypassing selection) do not move it. The cursor is not persisted: a
/// recreated strategy starts again at roster[0].
#[derive(Debug, Default)]
pub struct SequentialSelection {
    cursor: usize,
}

impl SequentialSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of selections made so far.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Start over at roster[0].
    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

impl SelectionStrategy for SequentialSelection {
    fn name(&self) -> &str {
        "sequential"
    }

    fn select(
        &mut self,
        roster: &AgentRoster,
        _history: &HistorySnapshot,
    ) -> impl Future<Output = Result<Arc<dyn Agent>, SelectionError>> + Send {
        let picked = match roster.get(self.cursor % roster.len().max(1)) {
            Some(agent) => {
                self.cursor += 1;
                Ok(Arc::clone(agent))
            }
            None => Err(SelectionError::EmptyRoster),
        };
        async move { picked }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ScriptedAgent;

    fn roster(names: &[&str]) -> AgentRoster {
        AgentRoster::from_agents(
            names
                .iter()
                .map(|n| Arc::new(ScriptedAgent::replying(n, ["ok"])) as Arc<dyn Agent>),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_first_selection_is_roster_head() {
        let roster = roster(&["Writer", "Reviewer"]);
        let mut selection = SequentialSelection::new();
        let agent = selection
            .select(&roster, &HistorySnapshot::default())
            .await
            .unwrap();
        assert_eq!(agent.info().author_identity(), "Writer");
    }

    #[tokio::test]
    async fn test_cycle_is_k_mod_n() {
        for n in 1..=4usize {
            let names: Vec<String> = (0..n).map(|i| format!("agent-{i}")).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let roster = roster(&refs);
            let mut selection = SequentialSelection::new();

            for k in 0..(3 * n) {
                let agent = selection
                    .select(&roster, &HistorySnapshot::default())
                    .await
                    .unwrap();
                assert_eq!(agent.info().author_identity(), names[k % n]);
            }
        }
    }

    #[tokio::test]
    async fn test_empty_roster_fails() {
        let mut selection = SequentialSelection::new();
        let err = selection
            .select(&AgentRoster::new(), &HistorySnapshot::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SelectionError::EmptyRoster));
        assert_eq!(selection.cursor(), 0);
    }

    #[tokio::test]
    async fn test_reset_returns_to_head() {
        let roster = roster(&["Writer", "Reviewer"]);
        let mut selection = SequentialSelection::new();
        selection.select(&roster, &HistorySnapshot::default()).await.unwrap();
        selection.reset();
        let agent = selection
            .select(&roster, &HistorySnapshot::default())
            .await
            .unwrap();
        assert_eq!(agent.info().author_identity(), "Writer");
    }
}
