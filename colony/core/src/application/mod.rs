// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod transition;
pub mod tour_constructor;
pub mod reference_solver;
pub mod peer_table;
pub mod round_coordinator;

// Re-export the entry points for convenience
pub use reference_solver::{find_optimal_tour, ReferenceSolution, SolveError};
pub use round_coordinator::{RoundCoordinator, RoundPhase, WorkerReport};
pub use tour_constructor::{enumerate_tours, SearchError, SearchStep, StochasticSearch};
