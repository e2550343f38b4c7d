// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Message
//!
//! Protocol payloads exchanged between queen agents. Every message travels in
//! an [`Envelope`] whose header repeats the sender's latest queen index,
//! lifecycle state and coordinate, so peers refresh their metadata from any
//! message, not just the dedicated announcements.

use serde::{Deserialize, Serialize};

use crate::domain::agent::{AgentName, AgentState, Coordinate};
use crate::domain::nogood::NoGood;
use crate::domain::termination::TerminationToken;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    /// Announces the sender's queen index during start-up
    MyQueen { index: usize },
    MyPosition { x: usize, y: usize },
    MyState { state: AgentState },
    /// `ok?`: the sender's current value, sent from parent to child
    Ok { position: usize },
    /// Conflict explanation sent from child to parent. Includes the
    /// receiver's own entry.
    NoGood { record: NoGood },
    Token { token: TerminationToken },
    Terminate { success: bool },
}

impl Payload {
    /// `Ok?` and `NoGood` are the messages counted by termination detection.
    pub fn is_abt(&self) -> bool {
        matches!(self, Payload::Ok { .. } | Payload::NoGood { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Payload::MyQueen { .. } => "my_queen",
            Payload::MyPosition { .. } => "my_position",
            Payload::MyState { .. } => "my_state",
            Payload::Ok { .. } => "ok",
            Payload::NoGood { .. } => "no_good",
            Payload::Token { .. } => "token",
            Payload::Terminate { .. } => "terminate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub sender: AgentName,
    pub queen: Option<usize>,
    pub state: AgentState,
    pub coordinate: Option<Coordinate>,
    pub payload: Payload,
}
