// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Round Coordinator
//!
//! Per-worker state machine driving construction, status exchange and the
//! global pheromone update:
//!
//! ```text
//! Init ──▶ Searching ──▶ AwaitingPeers ──▶ Init | Terminated
//!   ▲          │
//!   └──────────┘  dead end: round abandoned and retried
//! ```
//!
//! The coordinator never blocks. Each [`RoundCoordinator::tick`] does one
//! bounded piece of work (start a round, take one search step, or check the
//! barrier) and [`RoundCoordinator::drain_inbox`] folds pending peer statuses
//! into the local table between ticks. The barrier at `AwaitingPeers` is a
//! poll: it passes once every rostered peer and this worker have finished the
//! current round.
//!
//! All workers fold the same set of reported tours in worker id order, so
//! with round tagging enabled their pheromone tables stay identical.

use crate::application::peer_table::PeerStatusTable;
use crate::application::tour_constructor::{SearchError, SearchStep, StochasticSearch};
use crate::domain::collaborator::{Envelope, MessageTransport, PeerDirectory, ResultsWriter};
use crate::domain::colony_config::{OriginMode, SearchParameters};
use crate::domain::events::ColonyEvent;
use crate::domain::graph::{CityGraph, CityId, ColonyEnvironment};
use crate::domain::pheromone::PheromoneTable;
use crate::domain::status::{ProtocolError, WorkerId, WorkerStatus, STATUS_CONVERSATION};
use crate::domain::tour::Tour;
use crate::infrastructure::event_bus::EventBus;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    Init,
    Searching,
    AwaitingPeers,
    Terminated,
}

/// Final state of one worker.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerReport {
    pub worker: WorkerId,
    pub rounds_completed: u64,
    pub rounds_abandoned: u64,
    /// Shortest tour seen in any completed round, own or reported.
    pub best_tour: Option<Tour>,
    pub pheromone: PheromoneTable,
    pub persisted: bool,
}

pub struct RoundCoordinator {
    id: WorkerId,
    environment: Arc<ColonyEnvironment>,
    params: SearchParameters,
    directory: Arc<dyn PeerDirectory>,
    transport: Arc<dyn MessageTransport>,
    writer: Option<Arc<dyn ResultsWriter>>,
    event_bus: Option<EventBus>,
    rng: StdRng,

    pheromone: PheromoneTable,
    peers: PeerStatusTable,
    phase: RoundPhase,
    /// Index of the current round, equal to the number of completed rounds.
    round: u64,
    rounds_abandoned: u64,
    origin: CityId,
    search: Option<StochasticSearch>,
    own_tour: Option<Tour>,
    best_tour: Option<Tour>,
    persisted: bool,
}

impl RoundCoordinator {
    pub fn new(
        id: WorkerId,
        environment: Arc<ColonyEnvironment>,
        params: SearchParameters,
        directory: Arc<dyn PeerDirectory>,
        transport: Arc<dyn MessageTransport>,
    ) -> Self {
        let pheromone =
            PheromoneTable::filled(environment.graph.edge_count(), params.initial_pheromone);
        let origin = environment.origin;
        Self {
            id,
            environment,
            params,
            directory,
            transport,
            writer: None,
            event_bus: None,
            rng: StdRng::from_os_rng(),
            pheromone,
            peers: PeerStatusTable::new(),
            phase: RoundPhase::Init,
            round: 0,
            rounds_abandoned: 0,
            origin,
            search: None,
            own_tour: None,
            best_tour: None,
            persisted: false,
        }
    }

    /// Writer used if this worker ends up persisting the results.
    pub fn with_writer(mut self, writer: Arc<dyn ResultsWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Start from an existing table instead of the uniform initial level.
    pub fn with_pheromone(mut self, pheromone: PheromoneTable) -> Self {
        self.pheromone = pheromone;
        self
    }

    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn rounds_completed(&self) -> u64 {
        self.round
    }

    pub fn rounds_abandoned(&self) -> u64 {
        self.rounds_abandoned
    }

    pub fn origin(&self) -> CityId {
        self.origin
    }

    pub fn pheromone(&self) -> &PheromoneTable {
        &self.pheromone
    }

    /// Tour this worker found in the current round, once it has one.
    pub fn own_tour(&self) -> Option<&Tour> {
        self.own_tour.as_ref()
    }

    pub fn best_tour(&self) -> Option<&Tour> {
        self.best_tour.as_ref()
    }

    pub fn peers(&self) -> &PeerStatusTable {
        &self.peers
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == RoundPhase::Terminated
    }

    pub fn report(&self) -> WorkerReport {
        WorkerReport {
            worker: self.id.clone(),
            rounds_completed: self.round,
            rounds_abandoned: self.rounds_abandoned,
            best_tour: self.best_tour.clone(),
            pheromone: self.pheromone.clone(),
            persisted: self.persisted,
        }
    }

    fn graph(&self) -> &CityGraph {
        &self.environment.graph
    }

    fn round_tag(&self) -> Option<u64> {
        self.params.round_tagging.then_some(self.round)
    }

    /// Advance the state machine by one bounded unit of work.
    pub async fn tick(&mut self) -> RoundPhase {
        match self.phase {
            RoundPhase::Init => self.begin_round().await,
            RoundPhase::Searching => self.search_step(),
            RoundPhase::AwaitingPeers => self.try_complete_round().await,
            RoundPhase::Terminated => {}
        }
        self.phase
    }

    async fn begin_round(&mut self) {
        self.origin = match self.params.origin_mode {
            OriginMode::Fixed => self.environment.origin,
            OriginMode::RandomPerRound => {
                let city_count = self.graph().city_count() as u32;
                CityId(self.rng.random_range(1..=city_count))
            }
        };

        match self
            .directory
            .list_peers(&self.params.service_tag, &self.id)
            .await
        {
            Ok(peers) => self.peers.set_roster(peers),
            Err(e) => warn!(
                worker = %self.id,
                round = self.round,
                error = %e,
                "Peer roster refresh failed, keeping last known roster"
            ),
        }
        self.peers.discard_before(self.round);

        self.search = Some(StochasticSearch::new(&self.environment.graph, self.origin));
        self.own_tour = None;
        self.broadcast(WorkerStatus::started(self.id.clone(), self.round_tag()));

        debug!(
            worker = %self.id,
            round = self.round,
            origin = %self.origin,
            peers = self.peers.len(),
            "Round started"
        );
        self.publish(ColonyEvent::RoundStarted {
            worker: self.id.clone(),
            round: self.round,
            origin: self.origin,
            started_at: Utc::now(),
        });
        self.phase = RoundPhase::Searching;
    }

    fn search_step(&mut self) {
        let Some(search) = self.search.as_mut() else {
            self.phase = RoundPhase::Init;
            return;
        };

        match search.step(
            &self.environment.graph,
            &self.pheromone,
            self.params.beta,
            &mut self.rng,
        ) {
            SearchStep::Advanced { edge, depth } => {
                trace!(worker = %self.id, edge, depth, "Advanced");
            }
            SearchStep::Backtracked { depth } => {
                trace!(worker = %self.id, depth, "Backtracked");
            }
            SearchStep::Completed(tour) => {
                let steps = search.steps();
                self.search = None;
                self.finish_search(tour, steps);
            }
            SearchStep::Exhausted => {
                let error = SearchError::DeadEnd { origin: search.origin() };
                self.search = None;
                self.abandon_round(error);
            }
        }
    }

    fn finish_search(&mut self, tour: Tour, steps: u64) {
        debug!(
            worker = %self.id,
            round = self.round,
            length = tour.length(),
            steps,
            "Tour found"
        );
        self.publish(ColonyEvent::TourFound {
            worker: self.id.clone(),
            round: self.round,
            length: tour.length(),
            steps,
            found_at: Utc::now(),
        });
        self.broadcast(WorkerStatus::finished(
            self.id.clone(),
            tour.clone(),
            self.round_tag(),
        ));
        self.own_tour = Some(tour);
        self.phase = RoundPhase::AwaitingPeers;
    }

    fn abandon_round(&mut self, error: SearchError) {
        self.rounds_abandoned += 1;
        warn!(worker = %self.id, round = self.round, error = %error, "Round abandoned, retrying");
        self.publish(ColonyEvent::RoundAbandoned {
            worker: self.id.clone(),
            round: self.round,
            reason: error.to_string(),
            abandoned_at: Utc::now(),
        });
        self.phase = RoundPhase::Init;
    }

    async fn try_complete_round(&mut self) {
        let Some(own_tour) = self.own_tour.clone() else {
            self.phase = RoundPhase::Init;
            return;
        };
        if !self.peers.all_finished(self.round) {
            return;
        }

        let mut tours = self.peers.finished_tours(self.round);
        tours.push((self.id.clone(), own_tour));
        tours.sort_by(|a, b| a.0.cmp(&b.0));

        if let Err(e) = self.pheromone.apply_global_update(
            tours.iter().map(|(_, tour)| tour),
            self.params.decay,
            self.params.deposit,
        ) {
            warn!(
                worker = %self.id,
                round = self.round,
                error = %e,
                "Pheromone update failed, table left unchanged"
            );
        }

        let round_best = tours
            .iter()
            .map(|(_, tour)| tour)
            .min_by(|a, b| a.length().total_cmp(&b.length()));
        if let Some(candidate) = round_best {
            if self
                .best_tour
                .as_ref()
                .is_none_or(|best| candidate.is_shorter_than(best))
            {
                self.best_tour = Some(candidate.clone());
            }
        }
        let round_best = round_best.map_or(f64::INFINITY, Tour::length);
        let best_length = self.best_tour.as_ref().map_or(f64::INFINITY, Tour::length);

        info!(
            worker = %self.id,
            round = self.round,
            tours = tours.len(),
            round_best,
            best_length,
            "Round completed"
        );
        self.publish(ColonyEvent::RoundCompleted {
            worker: self.id.clone(),
            round: self.round,
            tours: tours.len(),
            round_best,
            best_length,
            completed_at: Utc::now(),
        });

        self.round += 1;
        self.own_tour = None;
        self.peers.discard_before(self.round);

        if self.round >= self.params.rounds {
            self.terminate().await;
        } else {
            self.phase = RoundPhase::Init;
        }
    }

    /// Whether this worker sorts first among itself and its known peers.
    pub fn is_persisting_worker(&self) -> bool {
        self.peers.roster().all(|peer| self.id <= *peer)
    }

    async fn terminate(&mut self) {
        self.phase = RoundPhase::Terminated;

        if self.is_persisting_worker() {
            if let Some(writer) = self.writer.clone() {
                self.persisted = self.persist(writer.as_ref()).await;
            } else {
                debug!(worker = %self.id, "No results writer attached, nothing persisted");
            }
        }

        info!(
            worker = %self.id,
            rounds = self.round,
            abandoned = self.rounds_abandoned,
            best_length = self.best_tour.as_ref().map(Tour::length),
            persisted = self.persisted,
            "Worker terminated"
        );
        self.publish(ColonyEvent::WorkerTerminated {
            worker: self.id.clone(),
            rounds_completed: self.round,
            best_length: self.best_tour.as_ref().map(Tour::length),
            persisted: self.persisted,
            terminated_at: Utc::now(),
        });
    }

    async fn persist(&self, writer: &dyn ResultsWriter) -> bool {
        let graph = self.graph();
        if let Err(e) = writer.write_pheromone_table(&self.pheromone, graph).await {
            warn!(worker = %self.id, error = %e, "Failed to persist pheromone levels");
            return false;
        }
        if let Some(tour) = &self.best_tour {
            if let Err(e) = writer.write_tour(tour, graph).await {
                warn!(worker = %self.id, error = %e, "Failed to persist best tour");
                return false;
            }
        }
        info!(worker = %self.id, "Results persisted");
        true
    }

    /// Fold one received message into the peer status table.
    pub fn handle_envelope(&mut self, envelope: Envelope) -> Result<(), ProtocolError> {
        let status = WorkerStatus::decode(envelope.sender, &envelope.payload)?;

        if let Some(tour) = &status.tour {
            let graph = self.graph();
            let origin = tour.origin(graph).unwrap_or(self.origin);
            tour.validate(graph, origin)
                .map_err(|e| ProtocolError::InvalidTour {
                    worker: status.worker.clone(),
                    reason: e.to_string(),
                })?;
        }

        let worker = status.worker.clone();
        let finished = status.finished;
        let admission = self.peers.record(status, self.round)?;
        trace!(worker = %self.id, peer = %worker, finished, ?admission, "Peer status recorded");
        Ok(())
    }

    /// Handle every pending status message. Rejected messages are logged and
    /// dropped. Returns the number of messages taken from the transport.
    pub fn drain_inbox(&mut self) -> usize {
        let mut drained = 0;
        while let Some(envelope) = self.transport.try_receive(STATUS_CONVERSATION) {
            drained += 1;
            let sender = envelope.sender.clone();
            if let Err(e) = self.handle_envelope(envelope) {
                warn!(worker = %self.id, peer = %sender, error = %e, "Discarding peer status");
            }
        }
        drained
    }

    /// Cooperative loop: one tick, one inbox drain, then yield to the
    /// scheduler, until the round budget is spent.
    pub async fn run_until_terminated(&mut self) -> WorkerReport {
        info!(
            worker = %self.id,
            rounds = self.params.rounds,
            cities = self.graph().city_count(),
            "Worker starting"
        );
        while !self.is_terminated() {
            self.tick().await;
            self.drain_inbox();
            tokio::task::yield_now().await;
        }
        self.report()
    }

    fn broadcast(&self, status: WorkerStatus) {
        let payload = status.encode();
        for peer in self.peers.roster() {
            if let Err(e) = self.transport.send(peer, STATUS_CONVERSATION, &payload) {
                warn!(worker = %self.id, peer = %peer, error = %e, "Failed to send status");
            }
        }
    }

    fn publish(&self, event: ColonyEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}
