// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Random-proportional transition rule.
//!
//! ```text
//! weight(e) = pheromone[e] * (1 / length(e)) ^ beta
//! prob(e)   = weight(e) / Σ weight(e')          (all zero when Σ == 0)
//! ```

use crate::domain::graph::{CityId, EdgeIndex, Road};
use crate::domain::pheromone::PheromoneTable;
use rand::Rng;

/// `ln weight(e)`, or `None` when the edge weighs nothing.
///
/// Weights are compared in log space: `(1 / length) ^ beta` overflows for
/// very short roads long before the ratio between two edges does.
pub fn edge_log_weight(
    road: &Road,
    edge: EdgeIndex,
    pheromone: &PheromoneTable,
    beta: f64,
) -> Option<f64> {
    let level = pheromone.level(edge);
    if !(level.is_finite() && level > 0.0 && road.length.is_finite() && road.length > 0.0) {
        return None;
    }
    let log_weight = level.ln() - beta * road.length.ln();
    log_weight.is_finite().then_some(log_weight)
}

/// Weights scaled so the heaviest edge weighs exactly 1.
fn relative_weights(log_weights: &[Option<f64>]) -> Vec<f64> {
    let heaviest = log_weights
        .iter()
        .flatten()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    log_weights
        .iter()
        .map(|lw| lw.map_or(0.0, |lw| (lw - heaviest).exp()))
        .collect()
}

fn edge_weights(
    roads: &[Road],
    candidates: &[EdgeIndex],
    pheromone: &PheromoneTable,
    beta: f64,
) -> Vec<f64> {
    let log_weights: Vec<Option<f64>> = candidates
        .iter()
        .map(|&edge| {
            roads
                .get(edge)
                .and_then(|road| edge_log_weight(road, edge, pheromone, beta))
        })
        .collect();
    relative_weights(&log_weights)
}

/// Probability of each candidate edge, in the order given.
///
/// Edges missing from `roads` weigh nothing. When every weight is zero the
/// result is all zeros rather than a uniform distribution.
pub fn edge_probabilities(
    roads: &[Road],
    candidates: &[EdgeIndex],
    pheromone: &PheromoneTable,
    beta: f64,
) -> Vec<f64> {
    normalise(edge_weights(roads, candidates, pheromone, beta))
}

/// City-wise form of the rule: each candidate city is reached through the
/// first road in `roads` that leads from `current` to it.
///
/// `roads` is indexed exactly like `pheromone`, so it may be any edge list,
/// including one that was never validated into a [`crate::domain::graph::CityGraph`].
pub fn city_probabilities(
    roads: &[Road],
    current: CityId,
    candidates: &[CityId],
    pheromone: &PheromoneTable,
    beta: f64,
) -> Vec<f64> {
    let log_weights: Vec<Option<f64>> = candidates
        .iter()
        .map(|&city| {
            roads
                .iter()
                .position(|road| road.source == current && road.target == city)
                .and_then(|edge| edge_log_weight(&roads[edge], edge, pheromone, beta))
        })
        .collect();
    normalise(relative_weights(&log_weights))
}

fn normalise(mut weights: Vec<f64>) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total > 0.0 && total.is_finite() {
        for weight in &mut weights {
            *weight /= total;
        }
    } else {
        weights.iter_mut().for_each(|w| *w = 0.0);
    }
    weights
}

/// Draw one position from `candidates` by roulette wheel.
///
/// Falls back to a uniform draw when every candidate weighs zero, so a
/// colony can leave the all-zero initial table. Returns `None` only for an
/// empty candidate list.
pub fn sample_edge<R: Rng + ?Sized>(
    roads: &[Road],
    candidates: &[EdgeIndex],
    pheromone: &PheromoneTable,
    beta: f64,
    rng: &mut R,
) -> Option<usize> {
    if candidates.is_empty() {
        return None;
    }

    let weights = edge_weights(roads, candidates, pheromone, beta);
    let total: f64 = weights.iter().sum();

    if !(total > 0.0 && total.is_finite()) {
        return Some(rng.random_range(0..candidates.len()));
    }

    let target = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    let mut last_positive = 0;
    for (position, &weight) in weights.iter().enumerate() {
        if weight <= 0.0 {
            continue;
        }
        cumulative += weight;
        last_positive = position;
        if target < cumulative {
            return Some(position);
        }
    }

    // Rounding left the target past the final bucket
    Some(last_positive)
}
