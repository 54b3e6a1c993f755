// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Exhaustive Hamiltonian-cycle search used to benchmark the colony.
//!
//! Runs [`enumerate_tours`] from a fixed origin with no pruning beyond the
//! feasibility rule. Cost grows factorially with the number of cities, so
//! this is an offline tool only.

use crate::application::tour_constructor::enumerate_tours;
use crate::domain::graph::{CityGraph, CityId, EdgeIndex};
use crate::domain::tour::Tour;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum SolveError {
    #[error("graph has no Hamiltonian cycle through city {origin}")]
    NoHamiltonianCycle { origin: CityId },

    #[error("origin city {0} is not part of the graph")]
    UnknownOrigin(CityId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceSolution {
    pub best_tour: Tour,
    pub best_length: f64,
    pub worst_length: f64,
    /// Distinct undirected cycles; a cycle and its reversal count once.
    pub tour_count: usize,
    /// Cycles as enumerated, one per direction of travel.
    pub directed_tour_count: usize,
}

/// Find the shortest and longest Hamiltonian cycles through `origin`.
pub fn find_optimal_tour(graph: &CityGraph, origin: CityId) -> Result<ReferenceSolution, SolveError> {
    if !graph.contains(origin) {
        return Err(SolveError::UnknownOrigin(origin));
    }

    let mut best: Option<(Vec<EdgeIndex>, f64)> = None;
    let mut worst_length = f64::NEG_INFINITY;
    let mut undirected: HashSet<Vec<usize>> = HashSet::new();

    let directed_tour_count = enumerate_tours(graph, origin, |edges, length| {
        if best.as_ref().is_none_or(|(_, best_length)| length < *best_length) {
            best = Some((edges.to_vec(), length));
        }
        worst_length = worst_length.max(length);
        undirected.insert(canonical_cycle(graph, edges));
    });

    let (edges, best_length) = best.ok_or(SolveError::NoHamiltonianCycle { origin })?;
    debug!(
        directed = directed_tour_count,
        undirected = undirected.len(),
        best_length,
        worst_length,
        "Exhaustive search finished"
    );

    Ok(ReferenceSolution {
        best_tour: Tour::new(edges, best_length),
        best_length,
        worst_length,
        tour_count: undirected.len(),
        directed_tour_count,
    })
}

/// Undirected road ids of a cycle, oriented so that a cycle and its reversal
/// share one key.
fn canonical_cycle(graph: &CityGraph, edges: &[EdgeIndex]) -> Vec<usize> {
    let forward: Vec<usize> = edges.iter().map(|&e| graph.undirected_id(e)).collect();
    let backward: Vec<usize> = forward.iter().rev().copied().collect();
    forward.min(backward)
}
