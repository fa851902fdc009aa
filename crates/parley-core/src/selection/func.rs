//! Selection policy from a closure.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parley_types::error::SelectionError;

use super::SelectionStrategy;
use crate::agent::{Agent, AgentRoster};
use crate::history::HistorySnapshot;

type Chooser = dyn Fn(&AgentRoster, &HistorySnapshot) -> Option<usize> + Send + Sync;

/// Selection decided by a function of (roster, history).
///
/// The function returns a roster index, or `None` when no agent should act.
pub struct FnSelection {
    name: String,
    choose: Box<Chooser>,
}

impl FnSelection {
    pub fn new<F>(name: impl Into<String>, choose: F) -> Self
    where
        F: Fn(&AgentRoster, &HistorySnapshot) -> Option<usize> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            choose: Box::new(choose),
        }
    }

    fn pick(&self, roster: &AgentRoster, history: &HistorySnapshot) -> Result<Arc<dyn Agent>, SelectionError> {
        if roster.is_empty() {
            return Err(SelectionError::EmptyRoster);
        }
        let index = (self.choose)(roster, history).ok_or_else(|| SelectionError::NoEligibleAgent {
            reason: format!("'{}' declined to choose an agent", self.name),
        })?;
        roster
            .get(index)
            .cloned()
            .ok_or_else(|| SelectionError::NoEligibleAgent {
                reason: format!(
                    "'{}' chose index {index} but the roster has {} agents",
                    self.name,
                    roster.len()
                ),
            })
    }
}

impl SelectionStrategy for FnSelection {
    fn name(&self) -> &str {
        &self.name
    }

    fn select(
        &mut self,
        roster: &AgentRoster,
        history: &HistorySnapshot,
    ) -> impl Future<Output = Result<Arc<dyn Agent>, SelectionError>> + Send {
        let picked = self.pick(roster, history);
        async move { picked }
    }
}

impl fmt::Debug for FnSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSelection").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ScriptedAgent;
    use parley_types::message::ChatMessage;

    fn roster() -> AgentRoster {
        AgentRoster::from_agents([
            Arc::new(ScriptedAgent::replying("Writer", ["draft"])) as Arc<dyn Agent>,
            Arc::new(ScriptedAgent::replying("Reviewer", ["approve"])) as Arc<dyn Agent>,
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_reviewer_follows_writer() {
        // Reviewer answers whoever spoke last unless it was the reviewer.
        let mut selection = FnSelection::new("writer-then-reviewer", |roster, history| {
            match history.tail().and_then(|m| m.author.as_deref()) {
                Some(author) if author == "Writer" => roster.iter().position(|a| a.info().matches("Reviewer")),
                _ => Some(0),
            }
        });
        let roster = roster();

        let seeded = HistorySnapshot::from(vec![ChatMessage::user("concept")]);
        let first = selection.select(&roster, &seeded).await.unwrap();
        assert_eq!(first.info().author_identity(), "Writer");

        let after_writer = HistorySnapshot::from(vec![
            ChatMessage::user("concept"),
            ChatMessage::assistant("draft").with_author("Writer"),
        ]);
        let second = selection.select(&roster, &after_writer).await.unwrap();
        assert_eq!(second.info().author_identity(), "Reviewer");
    }

    #[tokio::test]
    async fn test_declining_is_no_eligible_agent() {
        let mut selection = FnSelection::new("nobody", |_, _| None);
        let err = selection
            .select(&roster(), &HistorySnapshot::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SelectionError::NoEligibleAgent { .. }));
    }

    #[tokio::test]
    async fn test_out_of_range_index_is_rejected() {
        let mut selection = FnSelection::new("overflow", |_, _| Some(9));
        let err = selection
            .select(&roster(), &HistorySnapshot::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("index 9"));
    }

    #[tokio::test]
    async fn test_empty_roster() {
        let mut selection = FnSelection::new("first", |_, _| Some(0));
        let err = selection
            .select(&AgentRoster::new(), &HistorySnapshot::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SelectionError::EmptyRoster));
    }
}
