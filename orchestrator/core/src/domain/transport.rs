// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Transport
//!
//! The two seams between the protocol engine and its environment: how an
//! agent exchanges messages ([`Transport`]) and how a driver runs an agent
//! ([`QueenAgent`]).

use thiserror::Error;

use crate::domain::agent::{Action, AgentName, Perception};
use crate::domain::message::Envelope;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Unknown recipient: {0}")]
    UnknownRecipient(AgentName),

    #[error("Mailbox of {0} is closed")]
    MailboxClosed(AgentName),

    #[error("Failed to encode envelope: {0}")]
    Encode(String),
}

/// Message plumbing used by one agent. Delivery is reliable and FIFO per
/// sender; sends are fire-and-forget.
pub trait Transport: Send {
    fn send(&self, to: &AgentName, envelope: Envelope) -> Result<(), TransportError>;

    /// Deliver to every other agent of the swarm.
    fn broadcast(&self, envelope: Envelope) -> Result<(), TransportError>;

    /// Drain every message that arrived since the last call, in arrival order.
    fn receive(&mut self) -> Vec<Envelope>;

    /// Report the agent's final outcome to whoever runs the swarm.
    fn notify_finished(&self, success: bool);
}

/// A reactive agent driven one turn at a time.
pub trait QueenAgent: Send {
    fn name(&self) -> &AgentName;

    /// Consume the turn's perception and inbound messages, return one move.
    fn deliberate(&mut self, perception: &Perception) -> Action;

    fn is_finished(&self) -> bool;

    /// `Some(success)` once finished.
    fn outcome(&self) -> Option<bool>;

    /// Column the agent currently intends to stand on.
    fn target_column(&self) -> Option<usize>;
}
