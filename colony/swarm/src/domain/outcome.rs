// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Colony Outcome
//!
//! - [`worker_ids`] names the workers of a colony (`ant-01`, `ant-02`, ...).
//! - [`ColonyOutcome`] collects the final [`WorkerReport`] of every worker.

use antcolony_core::application::round_coordinator::WorkerReport;
use antcolony_core::domain::status::WorkerId;
use antcolony_core::domain::tour::Tour;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Zero-padded worker ids, so lexical and numeric order agree.
pub fn worker_ids(count: usize) -> Vec<WorkerId> {
    let width = count.to_string().len().max(2);
    (1..=count)
        .map(|n| WorkerId::new(format!("ant-{n:0width$}")))
        .collect()
}

/// Result of a finished colony run.
///
/// # Invariants
///
/// - `reports` is sorted by worker id.
/// - At most one report has `persisted == true`.
#[derive(Debug, Clone, Serialize)]
pub struct ColonyOutcome {
    pub reports: Vec<WorkerReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ColonyOutcome {
    /// Shortest tour any worker saw.
    pub fn best_tour(&self) -> Option<&Tour> {
        self.reports
            .iter()
            .filter_map(|report| report.best_tour.as_ref())
            .min_by(|a, b| a.length().total_cmp(&b.length()))
    }

    /// Worker that wrote the results, if any did.
    pub fn persisted_by(&self) -> Option<&WorkerId> {
        self.reports
            .iter()
            .find(|report| report.persisted)
            .map(|report| &report.worker)
    }

    pub fn rounds_abandoned(&self) -> u64 {
        self.reports.iter().map(|report| report.rounds_abandoned).sum()
    }

    /// Whether every worker ended with the same pheromone table.
    pub fn pheromone_converged(&self) -> bool {
        self.reports
            .windows(2)
            .all(|pair| pair[0].pheromone == pair[1].pheromone)
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
