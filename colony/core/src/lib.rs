// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Lib
//!
//! Ant colony search engine for the travelling salesman problem: graph
//! model, pheromone table, backtracking tour construction, the per-worker
//! round coordinator and the exhaustive reference solver.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Search and synchronization logic shared by every worker

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
