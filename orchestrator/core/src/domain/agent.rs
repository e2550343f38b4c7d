// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::queen::Queen;

/// Login name of a queen agent (e.g. `a1`, `b1`). Unique within a swarm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentName(pub String);

impl AgentName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// The lifecycle state of a queen agent.
///
/// Variants are declared in lifecycle order; the derived `Ord` is used to ask
/// whether a peer has progressed at least as far as a given phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Discovering peers and announcing the queen index
    Init,
    /// Hierarchy established, waiting for every peer to establish it too
    InitI,
    /// Every peer has its hierarchy, waiting for the final go
    #[serde(rename = "init_ii")]
    InitII,
    /// Revising the assignment
    Working,
    /// Assignment stable, waiting on peers
    Idle,
    /// Solution found or infeasibility confirmed (absorbing)
    Finished,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AgentState::Init => "init",
            AgentState::InitI => "init_i",
            AgentState::InitII => "init_ii",
            AgentState::Working => "working",
            AgentState::Idle => "idle",
            AgentState::Finished => "finished",
        };
        f.write_str(label)
    }
}

/// Cell of the simulated grid: `x` runs along the columns, `y` along the rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: usize,
    pub y: usize,
}

impl Coordinate {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// What the driver tells an agent at the start of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perception {
    pub coordinate: Coordinate,
    pub step: u64,
}

/// One discrete movement per turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Skip,
    /// One column toward lower x
    West,
    /// One column toward higher x
    East,
    /// Row axis, reserved for initial placement
    North,
    /// Row axis, reserved for initial placement
    South,
}

impl Action {
    /// Single step from column `from` toward column `to`.
    pub fn toward(from: usize, to: usize) -> Self {
        match from.cmp(&to) {
            std::cmp::Ordering::Equal => Action::Skip,
            std::cmp::Ordering::Less => Action::East,
            std::cmp::Ordering::Greater => Action::West,
        }
    }
}

/// What an agent knows about one peer. Created on the first message from
/// that peer, refreshed on every later one, never removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentMetadata {
    pub name: AgentName,
    pub queen: Option<usize>,
    pub coordinate: Option<Coordinate>,
    pub state: AgentState,
    /// Peer outranks us and must be obeyed
    pub is_parent: bool,
    /// We outrank the peer and must inform it
    pub is_child: bool,
}

impl AgentMetadata {
    pub fn new(name: AgentName) -> Self {
        Self {
            name,
            queen: None,
            coordinate: None,
            state: AgentState::Init,
            is_parent: false,
            is_child: false,
        }
    }

    /// Re-derive the relationship flags against our own queen. Pure in the
    /// peer's queen index, so repeating it never changes the outcome.
    pub fn derive_relationship(&mut self, own: &Queen) {
        match self.queen {
            Some(queen) => {
                self.is_parent = own.is_parent_queen(queen);
                self.is_child = own.is_child_queen(queen);
            }
            None => {
                self.is_parent = false;
                self.is_child = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_toward() {
        assert_eq!(Action::toward(2, 2), Action::Skip);
        assert_eq!(Action::toward(0, 3), Action::East);
        assert_eq!(Action::toward(3, 1), Action::West);
    }

    #[test]
    fn test_state_ordering_follows_lifecycle() {
        assert!(AgentState::Init < AgentState::InitI);
        assert!(AgentState::InitI < AgentState::InitII);
        assert!(AgentState::InitII < AgentState::Working);
        assert!(AgentState::Idle < AgentState::Finished);
    }

    #[test]
    fn test_relationship_derivation() {
        use crate::domain::queen::ScanPolicy;

        let own = Queen::new(1, 4, ScanPolicy::Forward).unwrap();
        let mut peer = AgentMetadata::new(AgentName::from("b1"));
        peer.derive_relationship(&own);
        assert!(!peer.is_parent && !peer.is_child);

        peer.queen = Some(0);
        peer.derive_relationship(&own);
        assert!(peer.is_parent);
        assert!(!peer.is_child);

        peer.queen = Some(3);
        peer.derive_relationship(&own);
        assert!(peer.is_child);
        assert!(!peer.is_parent);
    }
}
