// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::graph::CityId;
use crate::domain::status::WorkerId;

/// Lifecycle events published by round coordinators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColonyEvent {
    RoundStarted {
        worker: WorkerId,
        round: u64,
        origin: CityId,
        started_at: DateTime<Utc>,
    },
    TourFound {
        worker: WorkerId,
        round: u64,
        length: f64,
        steps: u64,
        found_at: DateTime<Utc>,
    },
    RoundAbandoned {
        worker: WorkerId,
        round: u64,
        reason: String,
        abandoned_at: DateTime<Utc>,
    },
    RoundCompleted {
        worker: WorkerId,
        round: u64,
        tours: usize,
        round_best: f64,
        best_length: f64,
        completed_at: DateTime<Utc>,
    },
    WorkerTerminated {
        worker: WorkerId,
        rounds_completed: u64,
        best_length: Option<f64>,
        persisted: bool,
        terminated_at: DateTime<Utc>,
    },
}

impl ColonyEvent {
    pub fn worker(&self) -> &WorkerId {
        match self {
            Self::RoundStarted { worker, .. }
            | Self::TourFound { worker, .. }
            | Self::RoundAbandoned { worker, .. }
            | Self::RoundCompleted { worker, .. }
            | Self::WorkerTerminated { worker, .. } => worker,
        }
    }
}
