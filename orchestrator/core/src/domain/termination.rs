// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Termination
//!
//! Counting token circulated backward through the priority order to decide
//! that the swarm has gone quiet.

use serde::{Deserialize, Serialize};

use crate::domain::agent::AgentName;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationToken {
    initiator: AgentName,
    /// Every agent in priority order; index 0 is the root queen.
    agent_sequence: Vec<AgentName>,
    message_counter: i64,
    /// Set when any relaying agent received protocol traffic since its last
    /// visit, which makes the round inconclusive.
    tainted: bool,
}

impl TerminationToken {
    pub fn new(initiator: AgentName, agent_sequence: Vec<AgentName>) -> Self {
        Self {
            initiator,
            agent_sequence,
            message_counter: 0,
            tainted: false,
        }
    }

    pub fn initiator(&self) -> &AgentName {
        &self.initiator
    }

    pub fn agent_sequence(&self) -> &[AgentName] {
        &self.agent_sequence
    }

    pub fn message_counter(&self) -> i64 {
        self.message_counter
    }

    /// Add an agent's sent-minus-received balance.
    pub fn increment_counter(&mut self, balance: i64) {
        self.message_counter += balance;
    }

    pub fn is_tainted(&self) -> bool {
        self.tainted
    }

    pub fn taint(&mut self) {
        self.tainted = true;
    }

    pub fn is_initiator(&self, agent: &AgentName) -> bool {
        &self.initiator == agent
    }

    /// The agent the token travels to after `current`: one step back in
    /// priority order, with the root handing it back to the initiator.
    /// `None` if `current` is not part of the sequence.
    pub fn next_agent(&self, current: &AgentName) -> Option<&AgentName> {
        let index = self.agent_sequence.iter().position(|a| a == current)?;
        if index == 0 {
            Some(&self.initiator)
        } else {
            self.agent_sequence.get(index - 1)
        }
    }
}
