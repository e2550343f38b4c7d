// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Mailbox Transport - In-process message delivery between queen agents
//
// Every agent owns an unbounded tokio mpsc mailbox. Envelopes are encoded to
// JSON on send and decoded on receive, so the agents only ever exchange the
// wire representation, as they would over a real network.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::agent::AgentName;
use crate::domain::message::Envelope;
use crate::domain::transport::{Transport, TransportError};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub fn encode_envelope(envelope: &Envelope) -> Result<String, CodecError> {
    Ok(serde_json::to_string(envelope)?)
}

pub fn decode_envelope(raw: &str) -> Result<Envelope, CodecError> {
    Ok(serde_json::from_str(raw)?)
}

/// Final outcome reported by one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishNotice {
    pub agent: AgentName,
    pub success: bool,
}

/// Transports for a whole swarm plus the channel their finish notices
/// arrive on.
pub struct MailboxNetwork {
    pub transports: Vec<MailboxTransport>,
    pub notices: mpsc::UnboundedReceiver<FinishNotice>,
}

impl MailboxNetwork {
    /// One mailbox per name, returned in the same order as `names`.
    pub fn connect(names: &[AgentName]) -> Self {
        let (notice_tx, notices) = mpsc::unbounded_channel();
        let mut routes = BTreeMap::new();
        let mut inboxes = Vec::with_capacity(names.len());
        for name in names {
            let (tx, rx) = mpsc::unbounded_channel();
            routes.insert(name.clone(), tx);
            inboxes.push((name.clone(), rx));
        }

        let routes = Arc::new(routes);
        let transports = inboxes
            .into_iter()
            .map(|(name, inbox)| MailboxTransport {
                name,
                routes: Arc::clone(&routes),
                inbox,
                notices: notice_tx.clone(),
            })
            .collect();

        Self { transports, notices }
    }

    /// Drain the notices that are already available.
    pub fn drain_notices(&mut self) -> Vec<FinishNotice> {
        let mut drained = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            drained.push(notice);
        }
        drained
    }
}

pub struct MailboxTransport {
    name: AgentName,
    routes: Arc<BTreeMap<AgentName, mpsc::UnboundedSender<String>>>,
    inbox: mpsc::UnboundedReceiver<String>,
    notices: mpsc::UnboundedSender<FinishNotice>,
}

impl MailboxTransport {
    pub fn name(&self) -> &AgentName {
        &self.name
    }

    /// Push an already-encoded message into `to`'s mailbox.
    pub fn deliver_raw(&self, to: &AgentName, raw: String) -> Result<(), TransportError> {
        let route = self
            .routes
            .get(to)
            .ok_or_else(|| TransportError::UnknownRecipient(to.clone()))?;
        route
            .send(raw)
            .map_err(|_| TransportError::MailboxClosed(to.clone()))
    }
}

impl Transport for MailboxTransport {
    fn send(&self, to: &AgentName, envelope: Envelope) -> Result<(), TransportError> {
        let raw = encode_envelope(&envelope).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.deliver_raw(to, raw)
    }

    fn broadcast(&self, envelope: Envelope) -> Result<(), TransportError> {
        let raw = encode_envelope(&envelope).map_err(|e| TransportError::Encode(e.to_string()))?;
        for (peer, route) in self.routes.iter() {
            if peer == &self.name {
                continue;
            }
            // A finished peer may already have dropped its mailbox.
            if route.send(raw.clone()).is_err() {
                debug!(from = %self.name, to = %peer, "Broadcast skipped closed mailbox");
            }
        }
        Ok(())
    }

    fn receive(&mut self) -> Vec<Envelope> {
        let mut received = Vec::new();
        while let Ok(raw) = self.inbox.try_recv() {
            match decode_envelope(&raw) {
                Ok(envelope) => received.push(envelope),
                Err(e) => {
                    warn!(agent = %self.name, "Dropping message: {}", e);
                    metrics::counter!("abt_messages_dropped_total").increment(1);
                }
            }
        }
        received
    }

    fn notify_finished(&self, success: bool) {
        let notice = FinishNotice {
            agent: self.name.clone(),
            success,
        };
        if self.notices.send(notice).is_err() {
            debug!(agent = %self.name, "Nobody is listening for finish notices");
        }
    }
}
