//! Ordered set of agents taking part in a chat.

use std::fmt;
use std::sync::Arc;

use parley_types::error::RosterError;

use super::Agent;

/// The participants of a group chat, in turn order.
///
/// Agent ids are unique. Order is insertion order and is what sequential
/// selection walks.
#[derive(Clone, Default)]
pub struct AgentRoster {
    agents: Vec<Arc<dyn Agent>>,
}

impl AgentRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a roster, rejecting duplicate agent ids.
    pub fn from_agents(
        agents: impl IntoIterator<Item = Arc<dyn Agent>>,
    ) -> Result<Self, RosterError> {
        let mut roster = Self::new();
        for agent in agents {
            roster.add(agent)?;
        }
        Ok(roster)
    }

    /// Append an agent to the end of the turn order.
    pub fn add(&mut self, agent: Arc<dyn Agent>) -> Result<(), RosterError> {
        if self.contains(&agent.info().id) {
            return Err(RosterError::DuplicateAgent(agent.info().id.clone()));
        }
        self.agents.push(agent);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Roster index of the agent with this id.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.agents.iter().position(|a| a.info().id == id)
    }

    pub fn get(&self, index: usize) -> Option<&Arc<dyn Agent>> {
        self.agents.get(index)
    }

    /// Look an agent up by id or case-insensitive name.
    pub fn find(&self, key: &str) -> Option<&Arc<dyn Agent>> {
        self.agents
            .iter()
            .find(|a| a.info().id == key)
            .or_else(|| self.agents.iter().find(|a| a.info().matches(key)))
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Agent>> {
        self.agents.iter()
    }
}

impl fmt::Debug for AgentRoster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.agents.iter().map(|a| a.info().author_identity()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ScriptedAgent;
    use parley_types::agent::AgentInfo;

    fn agent(name: &str) -> Arc<dyn Agent> {
        Arc::new(ScriptedAgent::replying(name, ["ok"]))
    }

    #[test]
    fn test_roster_keeps_insertion_order() {
        let roster = AgentRoster::from_agents([agent("Writer"), agent("Reviewer")]).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.get(0).unwrap().info().author_identity(), "Writer");
        assert_eq!(roster.get(1).unwrap().info().author_identity(), "Reviewer");
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let info = AgentInfo::with_id("agent-1");
        let a: Arc<dyn Agent> = Arc::new(ScriptedAgent::new(info.clone(), Vec::new()));
        let b: Arc<dyn Agent> = Arc::new(ScriptedAgent::new(info, Vec::new()));

        let err = AgentRoster::from_agents([a, b]).unwrap_err();
        assert!(matches!(err, RosterError::DuplicateAgent(id) if id == "agent-1"));
    }

    #[test]
    fn test_find_by_id_or_name() {
        let writer = agent("Writer");
        let id = writer.info().id.clone();
        let roster = AgentRoster::from_agents([writer, agent("Reviewer")]).unwrap();

        assert_eq!(roster.position(&id), Some(0));
        assert!(roster.find("reviewer").is_some());
        assert!(roster.find(&id).is_some());
        assert!(roster.find("Critic").is_none());
    }

    #[test]
    fn test_debug_lists_identities() {
        let roster = AgentRoster::from_agents([agent("Writer")]).unwrap();
        assert_eq!(format!("{roster:?}"), r#"["Writer"]"#);
    }
}
