// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::agent::AgentName;

/// Identifies one solver run across every event it emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SwarmEvent {
    SwarmStarted {
        run_id: RunId,
        agents: usize,
        driver: String,
        started_at: DateTime<Utc>,
    },
    TurnCompleted {
        run_id: RunId,
        step: u64,
        /// Column of every avatar after the turn's moves, in queen order
        columns: Vec<usize>,
        finished: usize,
    },
    AgentFinished {
        run_id: RunId,
        agent: AgentName,
        success: bool,
        step: u64,
        finished_at: DateTime<Utc>,
    },
    SwarmCompleted {
        run_id: RunId,
        success: bool,
        steps: u64,
        columns: Vec<usize>,
        completed_at: DateTime<Utc>,
    },
    SwarmTimedOut {
        run_id: RunId,
        steps: u64,
        timed_out_at: DateTime<Utc>,
    },
}

impl SwarmEvent {
    pub fn run_id(&self) -> RunId {
        match self {
            SwarmEvent::SwarmStarted { run_id, .. }
            | SwarmEvent::TurnCompleted { run_id, .. }
            | SwarmEvent::AgentFinished { run_id, .. }
            | SwarmEvent::SwarmCompleted { run_id, .. }
            | SwarmEvent::SwarmTimedOut { run_id, .. } => *run_id,
        }
    }
}
