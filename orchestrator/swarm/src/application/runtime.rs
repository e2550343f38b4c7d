// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Async Driver - One tokio task per agent
//
// The driver still owns the world and the turn counter, but every agent
// deliberates on its own task, so the agents read and write their mailboxes
// concurrently and message interleavings differ from run to run.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use abt_core::domain::agent::{Action, Perception};
use abt_core::domain::config::DriverKind;
use abt_core::domain::events::SwarmEvent;
use abt_core::domain::transport::QueenAgent;
use abt_core::infrastructure::event_bus::EventBus;

use super::{launch, publish_completed, publish_finished_agents, publish_started, AgentReport, SwarmDriver, SwarmReport};
use crate::domain::{Swarm, SwarmError, World};

/// How long the driver waits for a single agent's move.
const TURN_TIMEOUT: Duration = Duration::from_secs(10);

struct TurnReply {
    index: usize,
    action: Action,
    target: Option<usize>,
    outcome: Option<bool>,
}

pub struct AsyncDriver {
    event_bus: EventBus,
}

impl AsyncDriver {
    pub fn new(event_bus: EventBus) -> Self {
        Self { event_bus }
    }
}

#[async_trait]
impl SwarmDriver for AsyncDriver {
    async fn run(&self, swarm: &Swarm) -> anyhow::Result<SwarmReport> {
        let (agents, mut network) = launch(swarm);
        let size = swarm.size();
        let mut world = World::new(size, swarm.spec.row_offset);

        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<TurnReply>();
        let mut perception_txs = Vec::with_capacity(size);
        let mut handles = Vec::with_capacity(size);
        for (index, mut agent) in agents.into_iter().enumerate() {
            let (perception_tx, mut perception_rx) = mpsc::unbounded_channel::<Perception>();
            let reply_tx = reply_tx.clone();
            handles.push(tokio::spawn(async move {
                while let Some(perception) = perception_rx.recv().await {
                    let action = agent.deliberate(&perception);
                    let reply = TurnReply {
                        index,
                        action,
                        target: agent.target_column(),
                        outcome: agent.outcome(),
                    };
                    if reply_tx.send(reply).is_err() || agent.is_finished() {
                        break;
                    }
                }
                debug!(agent = %agent.name(), "Agent task stopped");
            }));
            perception_txs.push(Some(perception_tx));
        }
        drop(reply_tx);

        publish_started(&self.event_bus, swarm, DriverKind::Async);

        let mut reports: Vec<AgentReport> = swarm
            .members
            .iter()
            .enumerate()
            .map(|(queen, name)| AgentReport {
                name: name.clone(),
                queen,
                target: None,
                outcome: None,
            })
            .collect();

        let mut steps = 0;
        for step in 1..=swarm.spec.max_turns {
            steps = step;

            let mut awaiting = BTreeSet::new();
            for (index, slot) in perception_txs.iter().enumerate() {
                let (Some(tx), Some(perception)) = (slot, world.perception(index, step)) else {
                    continue;
                };
                if tx.send(perception).is_ok() {
                    awaiting.insert(index);
                }
            }

            let mut actions = Vec::with_capacity(awaiting.len());
            while let Some(&first) = awaiting.first() {
                let reply = match tokio::time::timeout(TURN_TIMEOUT, reply_rx.recv()).await {
                    Ok(Some(reply)) => reply,
                    Ok(None) | Err(_) => {
                        let silent = reports[first].name.to_string();
                        return Err(SwarmError::AgentUnresponsive(silent).into());
                    }
                };
                awaiting.remove(&reply.index);
                let report = &mut reports[reply.index];
                report.target = reply.target;
                report.outcome = reply.outcome;
                if reply.outcome.is_some() {
                    perception_txs[reply.index] = None;
                }
                actions.push((reply.index, reply.action));
            }
            for (index, action) in actions {
                world.apply(index, action);
            }

            publish_finished_agents(&self.event_bus, swarm, &mut network, step);
            let finished = reports.iter().filter(|r| r.outcome.is_some()).count();
            self.event_bus.publish(SwarmEvent::TurnCompleted {
                run_id: swarm.id,
                step,
                columns: world.columns(),
                finished,
            });

            if finished == size {
                break;
            }
        }

        // Closing the perception channels stops the remaining tasks.
        drop(perception_txs);
        let results = futures::future::join_all(handles).await;
        for (report, result) in reports.iter().zip(results) {
            if let Err(e) = result {
                warn!(agent = %report.name, "Agent task failed: {}", e);
                return Err(SwarmError::AgentFailed(report.name.to_string(), e.to_string()).into());
            }
        }

        let report = SwarmReport::new(swarm, DriverKind::Async, steps, &world, reports);
        publish_completed(&self.event_bus, &report);
        Ok(report)
    }
}
