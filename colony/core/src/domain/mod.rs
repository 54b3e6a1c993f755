// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Road network, pheromone state, tours and the status protocol shared by
//! every worker, plus the contracts of the collaborators a worker talks to.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types and rules, no I/O

pub mod graph;
pub mod visit;
pub mod tour;
pub mod pheromone;
pub mod status;
pub mod collaborator;
pub mod events;
pub mod colony_config;
