// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `abt-swarm` - Swarm Drivers
//!
//! Launches one ABT agent per queen, moves their avatars on a simulated
//! grid and reports how the run ended.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `Swarm`, `World`, `SwarmError` |
//! | [`application`] | Application | `SwarmDriver`, `TurnBasedDriver`, `AsyncDriver`, `SwarmReport` |
//!
//! ## Drivers
//!
//! - **Turn-based**: deterministic lock-step turns on the calling thread,
//!   optionally with a seeded agent order.
//! - **Async**: every agent deliberates on its own tokio task.

pub mod application;
pub mod domain;

pub use domain::*;
