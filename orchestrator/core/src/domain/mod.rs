// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Constraint model, protocol vocabulary and configuration of the solver.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types shared by the protocol engine and the drivers

pub mod agent;
pub mod board;
pub mod config;
pub mod events;
pub mod message;
pub mod nogood;
pub mod queen;
pub mod termination;
pub mod transport;
