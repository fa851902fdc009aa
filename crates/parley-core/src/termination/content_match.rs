//! Stop when the latest message contains a marker.

use tokio_util::sync::CancellationToken;

use parley_types::agent::AgentInfo;
use parley_types::error::JudgeError;

use super::TerminationStrategy;
use crate::history::HistorySnapshot;

/// Terminates when the most recent message contains `marker`,
/// compared case-insensitively.
#[derive(Debug, Clone)]
pub struct ContentMatchTermination {
    marker: String,
}

impl ContentMatchTermination {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into().to_lowercase(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    fn matches(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.marker)
    }
}

impl TerminationStrategy for ContentMatchTermination {
    fn name(&self) -> &str {
        "content_match"
    }

    async fn should_agent_terminate(
        &self,
        _agent: &AgentInfo,
        history: &HistorySnapshot,
        _cancel: &CancellationToken,
    ) -> Result<bool, JudgeError> {
        Ok(history.tail().is_some_and(|m| self.matches(&m.content)))
    }
}
