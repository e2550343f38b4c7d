// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Swarm Drivers
//!
//! Execute a [`Swarm`] to completion against the simulated [`World`].
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Turn loop, agent launch and run reporting

pub mod runtime;
pub mod simulation;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use abt_core::application::{AbtAgent, AgentSettings};
use abt_core::domain::agent::AgentName;
use abt_core::domain::config::DriverKind;
use abt_core::domain::events::{RunId, SwarmEvent};
use abt_core::infrastructure::event_bus::EventBus;
use abt_core::infrastructure::transport::{MailboxNetwork, MailboxTransport};

use crate::domain::{Swarm, World};

pub use runtime::AsyncDriver;
pub use simulation::TurnBasedDriver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every agent finished with success
    Solved,
    /// The swarm proved that no placement exists
    Infeasible,
    /// `max_turns` elapsed first
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentReport {
    pub name: AgentName,
    pub queen: usize,
    pub target: Option<usize>,
    pub outcome: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwarmReport {
    pub run_id: RunId,
    pub driver: DriverKind,
    pub outcome: RunOutcome,
    pub steps: u64,
    /// Final column of every avatar, in queen order
    pub columns: Vec<usize>,
    pub agents: Vec<AgentReport>,
}

impl SwarmReport {
    fn new(swarm: &Swarm, driver: DriverKind, steps: u64, world: &World, agents: Vec<AgentReport>) -> Self {
        let outcome = if agents.iter().any(|a| a.outcome == Some(false)) {
            RunOutcome::Infeasible
        } else if agents.iter().all(|a| a.outcome == Some(true)) {
            RunOutcome::Solved
        } else {
            RunOutcome::TimedOut
        };
        Self {
            run_id: swarm.id,
            driver,
            outcome,
            steps,
            columns: world.columns(),
            agents,
        }
    }

    pub fn is_solved(&self) -> bool {
        self.outcome == RunOutcome::Solved
    }
}

/// Runs a whole swarm and reports how it ended.
#[async_trait]
pub trait SwarmDriver: Send + Sync {
    async fn run(&self, swarm: &Swarm) -> anyhow::Result<SwarmReport>;
}

pub fn driver_for(kind: DriverKind, event_bus: EventBus) -> Arc<dyn SwarmDriver> {
    match kind {
        DriverKind::TurnBased => Arc::new(TurnBasedDriver::new(event_bus)),
        DriverKind::Async => Arc::new(AsyncDriver::new(event_bus)),
    }
}

/// One agent per member, wired to a shared mailbox network.
fn launch(swarm: &Swarm) -> (Vec<AbtAgent<MailboxTransport>>, MailboxNetwork) {
    let settings = AgentSettings::from_spec(&swarm.spec);
    let mut network = MailboxNetwork::connect(&swarm.members);
    let agents = network
        .transports
        .drain(..)
        .zip(swarm.members.iter())
        .map(|(transport, name)| AbtAgent::new(name.clone(), transport, settings))
        .collect();
    (agents, network)
}

fn publish_started(event_bus: &EventBus, swarm: &Swarm, driver: DriverKind) {
    info!(run_id = %swarm.id, agents = swarm.size(), %driver, "Swarm started");
    event_bus.publish(SwarmEvent::SwarmStarted {
        run_id: swarm.id,
        agents: swarm.size(),
        driver: driver.to_string(),
        started_at: Utc::now(),
    });
}

fn publish_finished_agents(event_bus: &EventBus, swarm: &Swarm, network: &mut MailboxNetwork, step: u64) {
    for notice in network.drain_notices() {
        event_bus.publish(SwarmEvent::AgentFinished {
            run_id: swarm.id,
            agent: notice.agent,
            success: notice.success,
            step,
            finished_at: Utc::now(),
        });
    }
}

fn publish_completed(event_bus: &EventBus, report: &SwarmReport) {
    let outcome = match report.outcome {
        RunOutcome::Solved => "solved",
        RunOutcome::Infeasible => "infeasible",
        RunOutcome::TimedOut => "timed_out",
    };
    metrics::counter!("abt_swarm_runs_total", "outcome" => outcome).increment(1);
    metrics::histogram!("abt_swarm_steps").record(report.steps as f64);
    info!(run_id = %report.run_id, outcome, steps = report.steps, columns = ?report.columns, "Swarm completed");

    let event = match report.outcome {
        RunOutcome::TimedOut => SwarmEvent::SwarmTimedOut {
            run_id: report.run_id,
            steps: report.steps,
            timed_out_at: Utc::now(),
        },
        _ => SwarmEvent::SwarmCompleted {
            run_id: report.run_id,
            success: report.is_solved(),
            steps: report.steps,
            columns: report.columns.clone(),
            completed_at: Utc::now(),
        },
    };
    event_bus.publish(event);
}
