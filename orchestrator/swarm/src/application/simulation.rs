// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Turn-Based Driver - Deterministic lock-step simulation
//
// Each turn every unfinished agent deliberates once, in launch order or in a
// seeded shuffled order, and all moves are applied together afterwards. A
// message becomes visible at the recipient's next deliberation.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use abt_core::domain::config::DriverKind;
use abt_core::domain::events::SwarmEvent;
use abt_core::domain::transport::QueenAgent;
use abt_core::infrastructure::event_bus::EventBus;

use super::{launch, publish_completed, publish_finished_agents, publish_started, AgentReport, SwarmDriver, SwarmReport};
use crate::domain::{Swarm, World};

pub struct TurnBasedDriver {
    event_bus: EventBus,
}

impl TurnBasedDriver {
    pub fn new(event_bus: EventBus) -> Self {
        Self { event_bus }
    }

    /// Run the swarm on the calling thread.
    pub fn run_to_completion(&self, swarm: &Swarm) -> SwarmReport {
        let (mut agents, mut network) = launch(swarm);
        let size = swarm.size();
        let mut world = World::new(size, swarm.spec.row_offset);
        let mut rng = swarm.spec.shuffle_seed.map(StdRng::seed_from_u64);
        let mut order: Vec<usize> = (0..size).collect();

        publish_started(&self.event_bus, swarm, DriverKind::TurnBased);

        let mut steps = 0;
        for step in 1..=swarm.spec.max_turns {
            steps = step;
            if let Some(rng) = rng.as_mut() {
                order.shuffle(rng);
            }

            let mut actions = Vec::with_capacity(size);
            for &index in &order {
                let agent = &mut agents[index];
                if agent.is_finished() {
                    continue;
                }
                if let Some(perception) = world.perception(index, step) {
                    actions.push((index, agent.deliberate(&perception)));
                }
            }
            for (index, action) in actions {
                world.apply(index, action);
            }

            publish_finished_agents(&self.event_bus, swarm, &mut network, step);
            let finished = agents.iter().filter(|agent| agent.is_finished()).count();
            self.event_bus.publish(SwarmEvent::TurnCompleted {
                run_id: swarm.id,
                step,
                columns: world.columns(),
                finished,
            });

            if finished == size {
                debug!(run_id = %swarm.id, step, "All agents finished");
                break;
            }
        }

        let reports = agents
            .iter()
            .enumerate()
            .map(|(queen, agent)| AgentReport {
                name: agent.name().clone(),
                queen,
                target: agent.target_column(),
                outcome: agent.outcome(),
            })
            .collect();
        let report = SwarmReport::new(swarm, DriverKind::TurnBased, steps, &world, reports);
        publish_completed(&self.event_bus, &report);
        report
    }
}

#[async_trait]
impl SwarmDriver for TurnBasedDriver {
    async fn run(&self, swarm: &Swarm) -> anyhow::Result<SwarmReport> {
        Ok(self.run_to_completion(swarm))
    }
}
