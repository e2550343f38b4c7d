// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Termination Detector
//!
//! Per-agent half of the token ring. Every agent counts the protocol
//! messages it sends and receives; the lowest-priority agent (the initiator)
//! periodically sends a [`TerminationToken`] backward through the priority
//! order to sum those counts. A round succeeds only if the sum is zero and
//! no agent received protocol traffic while the token was travelling.

use tracing::debug;

use crate::domain::agent::AgentName;
use crate::domain::termination::TerminationToken;

/// What the owning agent must do after [`TerminationDetector::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorAction {
    Forward { to: AgentName, token: TerminationToken },
    /// The swarm is quiescent; broadcast success.
    Conclude,
}

#[derive(Debug, Clone)]
pub struct TerminationDetector {
    /// Protocol messages sent minus received
    balance: i64,
    tainted: bool,
    idle_turns: u32,
    idle_threshold: u32,
    held: Option<TerminationToken>,
    round_outstanding: bool,
    rounds_started: u64,
}

impl TerminationDetector {
    pub fn new(idle_threshold: u32) -> Self {
        Self {
            balance: 0,
            tainted: false,
            idle_turns: 0,
            idle_threshold,
            held: None,
            round_outstanding: false,
            rounds_started: 0,
        }
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn is_tainted(&self) -> bool {
        self.tainted
    }

    pub fn is_holding(&self) -> bool {
        self.held.is_some()
    }

    pub fn rounds_started(&self) -> u64 {
        self.rounds_started
    }

    pub fn record_sent(&mut self) {
        self.balance += 1;
    }

    pub fn record_received(&mut self) {
        self.balance -= 1;
        self.tainted = true;
    }

    /// Count one more turn spent idle.
    pub fn tick_idle(&mut self) {
        self.idle_turns = self.idle_turns.saturating_add(1);
    }

    /// The agent went back to work.
    pub fn reset_idle(&mut self) {
        self.idle_turns = 0;
    }

    /// Keep a token until the agent is ready to pass it on.
    pub fn accept(&mut self, token: TerminationToken) {
        if self.held.replace(token).is_some() {
            debug!("Replaced a held termination token");
        }
    }

    /// Advance the protocol. `sequence` lists every agent in priority order;
    /// `ready` is true when the agent is idle and standing on its column.
    pub fn poll(&mut self, me: &AgentName, sequence: &[AgentName], ready: bool) -> Option<DetectorAction> {
        if !ready {
            return None;
        }

        let is_initiator = sequence.last() == Some(me);
        if is_initiator {
            self.poll_initiator(me, sequence)
        } else {
            self.relay(me)
        }
    }

    fn poll_initiator(&mut self, me: &AgentName, sequence: &[AgentName]) -> Option<DetectorAction> {
        if let Some(token) = self.held.take() {
            self.round_outstanding = false;
            let quiet = token.message_counter() + self.balance == 0 && !token.is_tainted() && !self.tainted;
            if quiet {
                metrics::counter!("abt_termination_rounds_total", "result" => "concluded").increment(1);
                return Some(DetectorAction::Conclude);
            }

            debug!(
                counter = token.message_counter(),
                balance = self.balance,
                tainted = token.is_tainted() || self.tainted,
                "Termination round inconclusive"
            );
            metrics::counter!("abt_termination_rounds_total", "result" => "discarded").increment(1);
            self.idle_turns = 0;
            return None;
        }

        if self.round_outstanding || self.idle_turns <= self.idle_threshold {
            return None;
        }

        let token = TerminationToken::new(me.clone(), sequence.to_vec());
        self.tainted = false;
        self.round_outstanding = true;
        self.rounds_started += 1;

        let next = token.next_agent(me)?.clone();
        if &next == me {
            // Single-agent swarm: the token is already home.
            self.held = Some(token);
            return None;
        }
        Some(DetectorAction::Forward { to: next, token })
    }

    fn relay(&mut self, me: &AgentName) -> Option<DetectorAction> {
        let mut token = self.held.take()?;
        token.increment_counter(self.balance);
        if self.tainted {
            token.taint();
        }
        self.tainted = false;

        match token.next_agent(me).cloned() {
            Some(to) => Some(DetectorAction::Forward { to, token }),
            None => {
                debug!(agent = %me, "Dropping termination token that does not list this agent");
                None
            }
        }
    }
}
