// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! ABT Core
//!
//! Protocol engine for solving N-Queens with Asynchronous Backtracking: one
//! agent per queen, cooperating only through messages.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Constraint model, agent state machine, termination
//!   detection and in-process message transport

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
