// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `abt solve` - run one swarm to completion
//!
//! Flags override the loaded configuration field by field. Progress is printed
//! from the event bus while the swarm runs; the final report goes to stdout,
//! either as a board diagram or as JSON.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{debug, info};

use abt_core::domain::config::{DriverKind, SolverConfigManifest, SolverSpec};
use abt_core::domain::events::SwarmEvent;
use abt_core::domain::queen::ScanPolicy;
use abt_core::infrastructure::event_bus::{EventBus, EventBusError, RunEventReceiver};
use abt_swarm::application::{driver_for, RunOutcome, SwarmReport};
use abt_swarm::Swarm;

#[derive(Args, Debug, Default)]
pub struct SolveArgs {
    /// Number of queens (and agents)
    #[arg(short = 'n', long)]
    pub agents: Option<usize>,

    /// Scheduling driver (turn-based, async)
    #[arg(long)]
    pub driver: Option<DriverKind>,

    /// Seed for shuffling the turn order of the turn-based driver
    #[arg(long)]
    pub seed: Option<u64>,

    /// Column scan order when a queen must move (forward, bidirectional)
    #[arg(long)]
    pub scan_policy: Option<ScanPolicy>,

    /// Idle turns before a termination round starts
    #[arg(long)]
    pub idle_threshold: Option<u32>,

    /// Give up after this many turns
    #[arg(long)]
    pub max_turns: Option<u64>,

    /// Serve Prometheus metrics on this address while solving
    #[arg(long, value_name = "ADDR")]
    pub metrics_addr: Option<SocketAddr>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl SolveArgs {
    /// Layer the command-line flags over a configured spec.
    pub fn apply_to(&self, mut spec: SolverSpec) -> SolverSpec {
        if let Some(agents) = self.agents {
            spec.agents = agents;
        }
        if let Some(driver) = self.driver {
            spec.driver = driver;
        }
        if let Some(seed) = self.seed {
            spec.shuffle_seed = Some(seed);
        }
        if let Some(policy) = self.scan_policy {
            spec.scan_policy = policy;
        }
        if let Some(threshold) = self.idle_threshold {
            spec.idle_threshold = threshold;
        }
        if let Some(turns) = self.max_turns {
            spec.max_turns = turns;
        }
        spec
    }
}

pub async fn execute(args: SolveArgs, config_override: Option<PathBuf>) -> Result<()> {
    let mut manifest = SolverConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;
    manifest.spec = args.apply_to(manifest.spec);
    manifest
        .validate()
        .context("Configuration validation failed")?;

    if let Some(addr) = args.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to start Prometheus exporter")?;
        info!(%addr, "Serving metrics");
    }

    let swarm = Swarm::new(manifest.spec.clone())?;
    let event_bus = EventBus::with_default_capacity();
    let printer = if args.json {
        None
    } else {
        println!(
            "{} {} queens, {} driver, run {}",
            "Solving".bold(),
            swarm.size(),
            swarm.spec.driver,
            swarm.id
        );
        Some(tokio::spawn(print_progress(event_bus.subscribe_run(swarm.id))))
    };

    let driver = driver_for(swarm.spec.driver, event_bus.clone());
    let report = driver.run(&swarm).await?;

    if let Some(printer) = printer {
        if let Err(e) = printer.await {
            debug!("Progress printer stopped: {}", e);
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.outcome == RunOutcome::TimedOut {
        anyhow::bail!("No result after {} turns", report.steps);
    }
    Ok(())
}

async fn print_progress(mut receiver: RunEventReceiver) {
    loop {
        match receiver.recv().await {
            Ok(SwarmEvent::AgentFinished {
                agent,
                success,
                step,
                ..
            }) => {
                let mark = if success { "✓".green() } else { "✗".red() };
                println!("  {} {} finished at turn {}", mark, agent, step);
            }
            Ok(SwarmEvent::SwarmCompleted { .. }) | Ok(SwarmEvent::SwarmTimedOut { .. }) => break,
            Ok(_) | Err(EventBusError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
}

fn print_report(report: &SwarmReport) {
    println!();
    match report.outcome {
        RunOutcome::Solved => {
            println!(
                "{}",
                format!("✓ Solved in {} turns", report.steps).green().bold()
            );
            println!();
            print!("{}", render_board(&report.columns));
        }
        RunOutcome::Infeasible => {
            println!(
                "{}",
                format!(
                    "✗ No placement exists for {} queens (proved in {} turns)",
                    report.columns.len(),
                    report.steps
                )
                .red()
                .bold()
            );
        }
        RunOutcome::TimedOut => {
            println!(
                "{}",
                format!("⚠ Gave up after {} turns", report.steps)
                    .yellow()
                    .bold()
            );
        }
    }
    println!();
    for agent in &report.agents {
        let target = agent
            .target
            .map(|column| column.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<4} queen {:<3} column {}", agent.name.as_str(), agent.queen, target);
    }
}

/// One line per row, `Q` where the queen stands.
pub fn render_board(columns: &[usize]) -> String {
    let mut out = String::new();
    for &column in columns {
        let row: Vec<&str> = (0..columns.len())
            .map(|x| if x == column { "Q" } else { "." })
            .collect();
        out.push_str(&row.join(" "));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_configured_spec() {
        let args = SolveArgs {
            agents: Some(6),
            driver: Some(DriverKind::Async),
            seed: Some(9),
            ..Default::default()
        };
        let spec = args.apply_to(SolverSpec::default());
        assert_eq!(spec.agents, 6);
        assert_eq!(spec.driver, DriverKind::Async);
        assert_eq!(spec.shuffle_seed, Some(9));
        assert_eq!(spec.idle_threshold, SolverSpec::default().idle_threshold);
    }

    #[test]
    fn test_no_flags_keep_configured_spec() {
        let configured = SolverSpec {
            agents: 8,
            max_turns: 50,
            ..SolverSpec::default()
        };
        assert_eq!(SolveArgs::default().apply_to(configured.clone()), configured);
    }

    #[test]
    fn test_render_board() {
        assert_eq!(
            render_board(&[1, 3, 0, 2]),
            ". Q . .\n. . . Q\nQ . . .\n. . Q .\n"
        );
    }
}
