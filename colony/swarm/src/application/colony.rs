// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Colony Runner
//!
//! Runs a whole colony inside one process:
//!
//! 1. register `workers` ids with the directory and open their mailboxes
//! 2. spawn one tokio task per worker, each running its coordinator's
//!    cooperative loop until the round budget is spent
//! 3. join every task, then deregister the workers and close their mailboxes

use crate::domain::{worker_ids, ColonyOutcome};
use crate::infrastructure::{InMemoryDirectory, MessageHub};
use anyhow::{Context, Result};
use antcolony_core::application::round_coordinator::RoundCoordinator;
use antcolony_core::domain::collaborator::{PeerDirectory, ResultsWriter};
use antcolony_core::domain::colony_config::ColonyConfig;
use antcolony_core::domain::graph::ColonyEnvironment;
use antcolony_core::infrastructure::event_bus::EventBus;
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

pub struct Colony {
    directory: Arc<InMemoryDirectory>,
    hub: Arc<MessageHub>,
    writer: Option<Arc<dyn ResultsWriter>>,
    event_bus: Option<EventBus>,
}

impl Colony {
    pub fn new() -> Self {
        Self {
            directory: Arc::new(InMemoryDirectory::new()),
            hub: MessageHub::new(),
            writer: None,
            event_bus: None,
        }
    }

    pub fn with_writer(mut self, writer: Arc<dyn ResultsWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn directory(&self) -> &Arc<InMemoryDirectory> {
        &self.directory
    }

    pub async fn run(
        &self,
        environment: Arc<ColonyEnvironment>,
        config: &ColonyConfig,
    ) -> Result<ColonyOutcome> {
        let params = config
            .parameters_for(&environment)
            .context("Invalid colony configuration")?;
        let started_at = Utc::now();
        let ids = worker_ids(config.workers);

        info!(
            workers = ids.len(),
            rounds = params.rounds,
            cities = environment.graph.city_count(),
            beta = params.beta,
            decay = params.decay,
            "Forming colony"
        );

        // Everyone is registered before anyone starts, so first rosters are complete
        for id in &ids {
            self.directory.register(&params.service_tag, id.clone());
        }

        let directory: Arc<dyn PeerDirectory> = self.directory.clone();
        let mut tasks = JoinSet::new();
        for (index, id) in ids.iter().enumerate() {
            let transport = Arc::new(self.hub.open_mailbox(id.clone()));
            let mut coordinator = RoundCoordinator::new(
                id.clone(),
                Arc::clone(&environment),
                params.clone(),
                Arc::clone(&directory),
                transport,
            );
            if let Some(seed) = config.seed {
                coordinator = coordinator.with_seed(seed.wrapping_add(index as u64));
            }
            if let Some(writer) = &self.writer {
                coordinator = coordinator.with_writer(Arc::clone(writer));
            }
            if let Some(bus) = &self.event_bus {
                coordinator = coordinator.with_event_bus(bus.clone());
            }

            tasks.spawn(async move { coordinator.run_until_terminated().await });
        }

        let mut reports = Vec::with_capacity(ids.len());
        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => {
                    warn!(error = %e, "Worker task failed");
                    failure.get_or_insert(e);
                }
            }
        }

        for id in &ids {
            self.directory.deregister(&params.service_tag, id);
            self.hub.close_mailbox(id);
        }

        if let Some(e) = failure {
            return Err(e).context("Colony worker task did not finish");
        }

        reports.sort_by(|a, b| a.worker.cmp(&b.worker));
        let outcome = ColonyOutcome {
            reports,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            best_length = outcome.best_tour().map(|t| t.length()),
            persisted_by = ?outcome.persisted_by(),
            elapsed_ms = outcome.elapsed().num_milliseconds(),
            "Colony finished"
        );
        Ok(outcome)
    }
}

impl Default for Colony {
    fn default() -> Self {
        Self::new()
    }
}
