// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Domain Layer
//!
//! Pure types for running a swarm. No I/O dependencies.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`swarm`] | `Swarm`, `SwarmError`, `agent_name` |
//! | [`world`] | `World` |

pub mod swarm;
pub mod world;

pub use swarm::*;
pub use world::*;
