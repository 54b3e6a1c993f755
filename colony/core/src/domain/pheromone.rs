// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Pheromone Table
//!
//! Per-edge pheromone intensity owned by a single worker. Other workers never
//! write into it; they influence it only through the tours they report, which
//! every worker folds in with the same global update rule:
//!
//! ```text
//! new[e] = (1 - decay) * old[e] + Σ deposit / length(w)   over tours w containing e
//! ```

use crate::domain::graph::EdgeIndex;
use crate::domain::tour::Tour;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PheromoneError {
    #[error("decay {0} is outside [0, 1)")]
    InvalidDecay(f64),

    #[error("deposit constant {0} must be finite and non-negative")]
    InvalidDeposit(f64),

    #[error("tour length {0} must be finite and positive")]
    InvalidTourLength(f64),

    #[error("edge {edge} is outside the table of {len} edges")]
    EdgeOutOfRange { edge: EdgeIndex, len: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PheromoneTable {
    levels: Vec<f64>,
}

impl PheromoneTable {
    /// All-zero table, the initial state of every worker.
    pub fn new(edge_count: usize) -> Self {
        Self::filled(edge_count, 0.0)
    }

    pub fn filled(edge_count: usize, level: f64) -> Self {
        Self {
            levels: vec![level; edge_count],
        }
    }

    pub fn from_levels(levels: Vec<f64>) -> Self {
        Self { levels }
    }

    /// Level of `edge`; unknown edges carry no pheromone.
    pub fn level(&self, edge: EdgeIndex) -> f64 {
        self.levels.get(edge).copied().unwrap_or(0.0)
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Apply one round of evaporation plus deposits from `tours`.
    ///
    /// A tour deposits at most once per edge. All inputs are checked before
    /// anything is written, so on error the table is left untouched.
    pub fn apply_global_update<'a>(
        &mut self,
        tours: impl IntoIterator<Item = &'a Tour>,
        decay: f64,
        deposit: f64,
    ) -> Result<(), PheromoneError> {
        if !(0.0..1.0).contains(&decay) {
            return Err(PheromoneError::InvalidDecay(decay));
        }
        if !deposit.is_finite() || deposit < 0.0 {
            return Err(PheromoneError::InvalidDeposit(deposit));
        }

        let mut deltas = vec![0.0; self.levels.len()];
        for tour in tours {
            if !tour.length().is_finite() || tour.length() <= 0.0 {
                return Err(PheromoneError::InvalidTourLength(tour.length()));
            }
            let amount = deposit / tour.length();
            let mut deposited = HashSet::with_capacity(tour.len());
            for &edge in tour.edges() {
                let slot = deltas.get_mut(edge).ok_or(PheromoneError::EdgeOutOfRange {
                    edge,
                    len: self.levels.len(),
                })?;
                if deposited.insert(edge) {
                    *slot += amount;
                }
            }
        }

        for (level, delta) in self.levels.iter_mut().zip(deltas) {
            *level = (1.0 - decay) * *level + delta;
        }
        Ok(())
    }
}
