// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! In-process peer directory.
//!
//! Workers register under a service tag when the colony forms and are taken
//! down when it finishes. Lookups never block on a writer for long: the
//! registry is a map behind a `parking_lot::RwLock`.

use antcolony_core::domain::collaborator::{DirectoryError, PeerDirectory};
use antcolony_core::domain::status::WorkerId;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    services: RwLock<BTreeMap<String, BTreeSet<WorkerId>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the worker was already registered under `service_tag`.
    pub fn register(&self, service_tag: &str, worker: WorkerId) -> bool {
        debug!(service = service_tag, worker = %worker, "Registering worker");
        self.services
            .write()
            .entry(service_tag.to_string())
            .or_default()
            .insert(worker)
    }

    /// Returns false if the worker was not registered under `service_tag`.
    pub fn deregister(&self, service_tag: &str, worker: &WorkerId) -> bool {
        let mut services = self.services.write();
        let Some(workers) = services.get_mut(service_tag) else {
            return false;
        };
        let removed = workers.remove(worker);
        if workers.is_empty() {
            services.remove(service_tag);
        }
        debug!(service = service_tag, worker = %worker, removed, "Deregistered worker");
        removed
    }

    /// Every worker registered under `service_tag`, in id order.
    pub fn members(&self, service_tag: &str) -> Vec<WorkerId> {
        self.services
            .read()
            .get(service_tag)
            .map(|workers| workers.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PeerDirectory for InMemoryDirectory {
    async fn list_peers(
        &self,
        service_tag: &str,
        own_id: &WorkerId,
    ) -> Result<Vec<WorkerId>, DirectoryError> {
        Ok(self
            .members(service_tag)
            .into_iter()
            .filter(|worker| worker != own_id)
            .collect())
    }
}
