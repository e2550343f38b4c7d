// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Aggregate
//!
//! - [`Swarm`]: aggregate root for one solver run, listing its members in
//!   launch order.
//! - [`SwarmError`]: failures of a run that are not protocol outcomes.
//!
//! Members carry login-style names `a1, b1, a2, b2, ...`. Launch order is also row order, so member `i`
//! controls queen `i`.

use chrono::{DateTime, Utc};
use thiserror::Error;

use abt_core::domain::agent::AgentName;
use abt_core::domain::config::SolverSpec;
use abt_core::domain::events::RunId;

#[derive(Debug, Error)]
pub enum SwarmError {
    #[error("A swarm needs at least one agent")]
    Empty,

    #[error("Agent {0} stopped unexpectedly: {1}")]
    AgentFailed(String, String),

    #[error("Agent {0} stopped answering")]
    AgentUnresponsive(String),
}

/// Login name of the agent launched in position `index` (0-based).
pub fn agent_name(index: usize) -> AgentName {
    let ordinal = index + 1;
    if ordinal % 2 == 1 {
        AgentName::new(format!("a{}", ordinal / 2 + 1))
    } else {
        AgentName::new(format!("b{}", ordinal / 2))
    }
}

#[derive(Debug, Clone)]
pub struct Swarm {
    pub id: RunId,
    pub spec: SolverSpec,
    /// Agent names in launch (and priority) order
    pub members: Vec<AgentName>,
    pub created_at: DateTime<Utc>,
}

impl Swarm {
    pub fn new(spec: SolverSpec) -> Result<Self, SwarmError> {
        if spec.agents == 0 {
            return Err(SwarmError::Empty);
        }
        let members = (0..spec.agents).map(agent_name).collect();
        Ok(Self {
            id: RunId::new(),
            spec,
            members,
            created_at: Utc::now(),
        })
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launcher_naming() {
        let names: Vec<String> = (0..5).map(|i| agent_name(i).to_string()).collect();
        assert_eq!(names, vec!["a1", "b1", "a2", "b2", "a3"]);
    }

    #[test]
    fn test_swarm_members_follow_spec() {
        let spec = SolverSpec {
            agents: 3,
            ..SolverSpec::default()
        };
        let swarm = Swarm::new(spec).unwrap();
        assert_eq!(swarm.size(), 3);
        assert_eq!(swarm.members[2], AgentName::from("a2"));
    }

    #[test]
    fn test_empty_swarm_is_rejected() {
        let spec = SolverSpec {
            agents: 0,
            ..SolverSpec::default()
        };
        assert!(matches!(Swarm::new(spec), Err(SwarmError::Empty)));
    }
}
