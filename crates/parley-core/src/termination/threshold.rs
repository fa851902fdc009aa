//! Stop when a numeric field of a structured reply passes a threshold.

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use parley_types::agent::AgentInfo;
use parley_types::config::Comparison;
use parley_types::error::JudgeError;

use super::TerminationStrategy;
use crate::history::HistorySnapshot;
use crate::json_result;

/// Parses the most recent message as JSON and terminates when
/// `field <comparison> threshold` holds.
///
/// `field` may be a dotted path (`"review.score"`). The value may be a JSON
/// number or a numeric string. A tail that does not parse, or lacks the
/// field, is "not satisfied" rather than an error.
#[derive(Debug, Clone)]
pub struct ThresholdTermination {
    field: String,
    comparison: Comparison,
    threshold: f64,
}

impl ThresholdTermination {
    pub fn new(field: impl Into<String>, comparison: Comparison, threshold: f64) -> Self {
        Self {
            field: field.into(),
            comparison,
            threshold,
        }
    }

    /// `score >= threshold`.
    pub fn score_at_least(threshold: f64) -> Self {
        Self::new("score", Comparison::Gte, threshold)
    }

    fn extract(&self, text: &str) -> Option<f64> {
        let root: Value = json_result::translate(text)?;
        let value = self
            .field
            .split('.')
            .try_fold(&root, |node, key| node.get(key))?;
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl TerminationStrategy for ThresholdTermination {
    fn name(&self) -> &str {
        "threshold"
    }

    async fn should_agent_terminate(
        &self,
        agent: &AgentInfo,
        history: &HistorySnapshot,
        _cancel: &CancellationToken,
    ) -> Result<bool, JudgeError> {
        let Some(tail) = history.tail() else {
            return Ok(false);
        };
        match self.extract(&tail.content) {
            Some(value) => Ok(self.comparison.holds(value, self.threshold)),
            None => {
                debug!(
                    agent = %agent.author_identity(),
                    field = %self.field,
                    "no numeric field in latest message, not terminating"
                );
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::message::ChatMessage;

    async fn judge(strategy: &ThresholdTermination, tail: &str) -> bool {
        let history = HistorySnapshot::from(vec![ChatMessage::assistant(tail)]);
        strategy
            .should_agent_terminate(&AgentInfo::named("Reviewer"), &history, &CancellationToken::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_score_above_threshold() {
        let strategy = ThresholdTermination::score_at_least(70.0);
        assert!(judge(&strategy, r#"{"score": 82, "notes": "strong"}"#).await);
        assert!(judge(&strategy, r#"{"score": 70, "notes": "just"}"#).await);
    }

    #[tokio::test]
    async fn test_score_below_threshold() {
        let strategy = ThresholdTermination::score_at_least(70.0);
        assert!(!judge(&strategy, r#"{"score": 55, "notes": "weak"}"#).await);
    }

    #[tokio::test]
    async fn test_malformed_json_does_not_terminate() {
        let strategy = ThresholdTermination::score_at_least(70.0);
        assert!(!judge(&strategy, r#"{"score": 82, "notes": "#).await);
        assert!(!judge(&strategy, "great work").await);
        assert!(!judge(&strategy, r#"{"notes": "no score"}"#).await);
    }

    #[tokio::test]
    async fn test_fenced_and_nested_field() {
        let strategy = ThresholdTermination::new("review.score", Comparison::Gt, 8.0);
        let tail = "```json\n{\"review\": {\"score\": \"9\"}}\n```";
        assert!(judge(&strategy, tail).await);
    }

    #[tokio::test]
    async fn test_lower_is_better() {
        let strategy = ThresholdTermination::new("defects", Comparison::Lte, 0.0);
        assert!(judge(&strategy, r#"{"defects": 0}"#).await);
        assert!(!judge(&strategy, r#"{"defects": 2}"#).await);
    }
}
