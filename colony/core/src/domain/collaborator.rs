// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # External Collaborator Interfaces
//!
//! Contracts the round coordinator needs from the outside world, defined in
//! the domain layer and implemented elsewhere:
//!
//! | Trait | Concern | Implementations |
//! |-------|---------|-----------------|
//! | [`PeerDirectory`] | Enumerate registered workers | `antcolony_swarm::InMemoryDirectory` |
//! | [`MessageTransport`] | Point-to-point text payloads | `antcolony_swarm::MailboxTransport` |
//! | [`ResultsWriter`] | Persist final pheromone and best tour | `FileResultsWriter`, `MemoryResultsWriter` |
//!
//! Delivery ordering and reliability belong to the transport. The coordinator
//! assumes every message is eventually delivered.

use crate::domain::graph::CityGraph;
use crate::domain::pheromone::PheromoneTable;
use crate::domain::status::WorkerId;
use crate::domain::tour::Tour;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// A received message together with its sender and conversation tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub sender: WorkerId,
    pub conversation: String,
    pub payload: String,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("peer directory unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum TransportError {
    #[error("no mailbox registered for {0}")]
    UnknownRecipient(WorkerId),

    #[error("mailbox of {0} is closed")]
    Closed(WorkerId),
}

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Lists the workers offering a service.
#[async_trait]
pub trait PeerDirectory: Send + Sync {
    /// Workers registered under `service_tag`, excluding `own_id`.
    async fn list_peers(
        &self,
        service_tag: &str,
        own_id: &WorkerId,
    ) -> Result<Vec<WorkerId>, DirectoryError>;
}

/// Non-blocking message exchange bound to one worker's mailbox.
pub trait MessageTransport: Send + Sync {
    fn send(&self, target: &WorkerId, conversation: &str, payload: &str)
        -> Result<(), TransportError>;

    /// Next pending message with the given conversation tag, if any.
    fn try_receive(&self, conversation: &str) -> Option<Envelope>;
}

/// Persists the results of a finished run.
#[async_trait]
pub trait ResultsWriter: Send + Sync {
    async fn write_pheromone_table(
        &self,
        table: &PheromoneTable,
        graph: &CityGraph,
    ) -> Result<(), WriterError>;

    async fn write_tour(&self, tour: &Tour, graph: &CityGraph) -> Result<(), WriterError>;
}
