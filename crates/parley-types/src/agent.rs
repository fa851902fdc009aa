//! Agent descriptor types for Parley.
//!
//! `AgentInfo` is the stable identity of a chat participant, independent of
//! how the agent produces its replies.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity and display metadata of a chat participant.
///
/// `id` is unique within a roster. `name` is optional; when present it is the
/// identity stamped into authored messages and used for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AgentInfo {
    /// Create an agent identity with a fresh UUIDv7 id and the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            name: Some(name.into()),
            description: None,
        }
    }

    /// Create an unnamed agent identity with an explicit id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The identity written into `ChatMessage::author`: the name, or the id.
    pub fn author_identity(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Whether `key` refers to this agent, by id or by (case-insensitive) name.
    pub fn matches(&self, key: &str) -> bool {
        self.id == key
            || self
                .name
                .as_deref()
                .is_some_and(|name| name_key(name) == name_key(key))
    }
}

/// Case-folded form of an agent name. Two names refer to the same agent
/// when their keys are equal.
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_identity_prefers_name() {
        let agent = AgentInfo::named("Writer");
        assert_eq!(agent.author_identity(), "Writer");

        let anon = AgentInfo::with_id("agent-7");
        assert_eq!(anon.author_identity(), "agent-7");
    }

    #[test]
    fn test_named_ids_are_unique() {
        let a = AgentInfo::named("Writer");
        let b = AgentInfo::named("Writer");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_matches_by_id_or_name() {
        let agent = AgentInfo::named("ArtDirector");
        assert!(agent.matches("artdirector"));
        assert!(agent.matches(&agent.id.clone()));
        assert!(!agent.matches("Writer"));
    }

    #[test]
    fn test_matches_non_ascii_name_case_insensitively() {
        let agent = AgentInfo::named("Éditeur");
        assert!(agent.matches("éditeur"));
        assert!(agent.matches("ÉDITEUR"));
        assert_eq!(name_key("Éditeur"), name_key("éditeur"));
    }
}
