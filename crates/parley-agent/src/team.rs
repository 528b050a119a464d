//! The set of agents taking part in a conversation.

use parley_core::AgentId;
use std::collections::HashMap;

use crate::agent::Agent;
use crate::error::ConfigError;

/// Agents keyed by id, validated as a whole.
///
/// Every sub-agent an agent declares must itself be a member, so delegation
/// can never name an agent that does not exist.
#[derive(Debug, Default)]
pub struct AgentTeam {
    agents: HashMap<AgentId, Agent>,
    order: Vec<AgentId>,
}

impl AgentTeam {
    /// Build a team.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateAgent`] if two agents share an id, or
    /// [`ConfigError::UnknownSubAgent`] if a declared sub-agent is missing.
    pub fn new(agents: impl IntoIterator<Item = Agent>) -> Result<Self, ConfigError> {
        let mut team = Self::default();
        for agent in agents {
            let id = agent.id().clone();
            if team.agents.contains_key(&id) {
                return Err(ConfigError::DuplicateAgent(id));
            }
            team.order.push(id.clone());
            team.agents.insert(id, agent);
        }

        for agent in team.iter() {
            if let Some(missing) = agent
                .sub_agents()
                .iter()
                .find(|sub| !team.agents.contains_key(*sub))
            {
                return Err(ConfigError::UnknownSubAgent {
                    agent: agent.id().clone(),
                    sub_agent: missing.clone(),
                });
            }
        }

        Ok(team)
    }

    pub fn get(&self, id: &AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.agents.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Agent ids in the order they were added.
    pub fn ids(&self) -> &[AgentId] {
        &self.order
    }

    /// Agents in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.order.iter().filter_map(|id| self.agents.get(id))
    }
}
