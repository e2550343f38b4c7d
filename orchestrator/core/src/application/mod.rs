// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod abt_agent;
pub mod termination_detector;

pub use abt_agent::{AbtAgent, AgentError, AgentSettings};
pub use termination_detector::{DetectorAction, TerminationDetector};
