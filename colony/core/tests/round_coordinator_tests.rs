// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use antcolony_core::application::round_coordinator::{RoundCoordinator, RoundPhase};
use antcolony_core::domain::collaborator::{
    DirectoryError, Envelope, MessageTransport, PeerDirectory, TransportError,
};
use antcolony_core::domain::colony_config::{ColonyConfig, SearchParameters};
use antcolony_core::domain::events::ColonyEvent;
use antcolony_core::domain::graph::{CityGraph, CityId, ColonyEnvironment, Road};
use antcolony_core::domain::pheromone::PheromoneTable;
use antcolony_core::domain::status::{ProtocolError, WorkerId, STATUS_CONVERSATION};
use antcolony_core::domain::tour::Tour;
use antcolony_core::infrastructure::event_bus::EventBus;
use antcolony_core::infrastructure::results_writer::MemoryResultsWriter;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// K4 with d12=1 d13=3 d14=4 d23=2 d24=5 d34=6.
// Edges: 0/1 = 1-2, 2/3 = 1-3, 4/5 = 1-4, 6/7 = 2-3, 8/9 = 2-4, 10/11 = 3-4
const TOUR_1234: &str = "13 0 6 10 5";
const TOUR_1243: &str = "15 0 8 11 3";

fn environment() -> Arc<ColonyEnvironment> {
    let graph = CityGraph::from_undirected(
        4,
        vec![
            Road::new(1, 2, 1.0),
            Road::new(1, 3, 3.0),
            Road::new(1, 4, 4.0),
            Road::new(2, 3, 2.0),
            Road::new(2, 4, 5.0),
            Road::new(3, 4, 6.0),
        ],
    )
    .unwrap();
    Arc::new(ColonyEnvironment {
        graph,
        origin: CityId(1),
        beta: 1.0,
        decay: Some(0.5),
    })
}

fn ant(name: &str) -> WorkerId {
    WorkerId::new(name)
}

struct MockDirectory {
    workers: Vec<WorkerId>,
}

#[async_trait]
impl PeerDirectory for MockDirectory {
    async fn list_peers(
        &self,
        _service_tag: &str,
        own_id: &WorkerId,
    ) -> Result<Vec<WorkerId>, DirectoryError> {
        Ok(self.workers.iter().filter(|w| *w != own_id).cloned().collect())
    }
}

struct FailingDirectory;

#[async_trait]
impl PeerDirectory for FailingDirectory {
    async fn list_peers(&self, _: &str, _: &WorkerId) -> Result<Vec<WorkerId>, DirectoryError> {
        Err(DirectoryError::Unavailable("registry offline".to_string()))
    }
}

/// Answers once, then stays unavailable.
struct FlakyDirectory {
    workers: Vec<WorkerId>,
    calls: AtomicUsize,
}

#[async_trait]
impl PeerDirectory for FlakyDirectory {
    async fn list_peers(
        &self,
        _service_tag: &str,
        own_id: &WorkerId,
    ) -> Result<Vec<WorkerId>, DirectoryError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
            return Err(DirectoryError::Unavailable("registry offline".to_string()));
        }
        Ok(self.workers.iter().filter(|w| *w != own_id).cloned().collect())
    }
}

#[derive(Default)]
struct MockTransport {
    inbox: Mutex<VecDeque<Envelope>>,
    sent: Mutex<Vec<(WorkerId, String)>>,
}

impl MockTransport {
    fn deliver(&self, sender: &str, payload: &str) {
        self.inbox.lock().push_back(Envelope {
            sender: ant(sender),
            conversation: STATUS_CONVERSATION.to_string(),
            payload: payload.to_string(),
        });
    }

    fn sent_to(&self, target: &str) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|(to, _)| to.as_str() == target)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

impl MessageTransport for MockTransport {
    fn send(&self, target: &WorkerId, conversation: &str, payload: &str) -> Result<(), TransportError> {
        assert_eq!(conversation, STATUS_CONVERSATION);
        self.sent.lock().push((target.clone(), payload.to_string()));
        Ok(())
    }

    fn try_receive(&self, conversation: &str) -> Option<Envelope> {
        let mut inbox = self.inbox.lock();
        let position = inbox.iter().position(|e| e.conversation == conversation)?;
        inbox.remove(position)
    }
}

fn parameters(config: ColonyConfig) -> SearchParameters {
    config.parameters_for(&environment()).unwrap()
}

fn coordinator(
    id: &str,
    config: ColonyConfig,
    transport: Arc<MockTransport>,
) -> RoundCoordinator {
    let directory = Arc::new(MockDirectory {
        workers: vec![ant("ant-01"), ant("ant-02"), ant("ant-03")],
    });
    RoundCoordinator::new(ant(id), environment(), parameters(config), directory, transport)
        .with_seed(7)
}

fn config(rounds: u64) -> ColonyConfig {
    ColonyConfig {
        rounds,
        initial_pheromone: 1.0,
        ..ColonyConfig::default()
    }
}

async fn tick_until(coordinator: &mut RoundCoordinator, phase: RoundPhase) {
    for _ in 0..1_000 {
        if coordinator.phase() == phase {
            return;
        }
        coordinator.tick().await;
        coordinator.drain_inbox();
    }
    panic!("never reached {phase:?}, stuck in {:?}", coordinator.phase());
}

#[tokio::test]
async fn test_update_waits_for_every_finished_peer() {
    let transport = Arc::new(MockTransport::default());
    let mut worker = coordinator("ant-01", config(3), transport.clone());
    let initial = worker.pheromone().clone();

    assert_eq!(worker.tick().await, RoundPhase::Searching);
    assert_eq!(transport.sent_to("ant-02"), vec!["0 @0".to_string()]);
    assert_eq!(transport.sent_to("ant-03"), vec!["0 @0".to_string()]);

    tick_until(&mut worker, RoundPhase::AwaitingPeers).await;
    let own = worker.own_tour().cloned().unwrap();
    assert_eq!(own.validate(&environment().graph, CityId(1)), Ok(()));
    assert!(transport.sent_to("ant-02")[1].starts_with("1 "));

    // Nobody else has finished: the barrier holds
    for _ in 0..5 {
        assert_eq!(worker.tick().await, RoundPhase::AwaitingPeers);
    }
    assert_eq!(worker.pheromone(), &initial);

    transport.deliver("ant-02", &format!("1 {TOUR_1234} @0"));
    assert_eq!(worker.drain_inbox(), 1);
    assert_eq!(worker.tick().await, RoundPhase::AwaitingPeers);
    assert_eq!(worker.pheromone(), &initial);
    assert_eq!(worker.round(), 0);

    transport.deliver("ant-03", &format!("1 {TOUR_1243} @0"));
    worker.drain_inbox();
    assert_eq!(worker.tick().await, RoundPhase::Init);
    assert_eq!(worker.round(), 1);

    let mut expected = initial.clone();
    let peer_a = Tour::new(vec![0, 6, 10, 5], 13.0);
    let peer_b = Tour::new(vec![0, 8, 11, 3], 15.0);
    expected
        .apply_global_update([&own, &peer_a, &peer_b], 0.5, 1.0)
        .unwrap();
    assert_eq!(worker.pheromone(), &expected);
    assert_eq!(worker.best_tour().map(Tour::length), Some(13.0));
}

#[tokio::test]
async fn test_run_terminates_and_lowest_worker_persists() {
    let transport = Arc::new(MockTransport::default());
    let writer = Arc::new(MemoryResultsWriter::new());
    let bus = EventBus::new(100);
    let mut events = bus.subscribe();
    let mut worker = coordinator("ant-01", config(2), transport.clone())
        .with_writer(writer.clone())
        .with_event_bus(bus);

    for round in 0..2 {
        tick_until(&mut worker, RoundPhase::AwaitingPeers).await;
        transport.deliver("ant-02", &format!("1 {TOUR_1234} @{round}"));
        transport.deliver("ant-03", &format!("1 {TOUR_1243} @{round}"));
        worker.drain_inbox();
        worker.tick().await;
    }

    assert!(worker.is_terminated());
    assert_eq!(worker.rounds_completed(), 2);

    let report = worker.report();
    assert!(report.persisted);
    assert_eq!(report.best_tour.map(|t| t.length()), Some(13.0));
    assert_eq!(writer.pheromone_writes().await.len(), 1);
    let tours = writer.tour_writes().await;
    assert_eq!(tours.len(), 1);
    assert!(tours[0].starts_with("length 13\n"));

    let mut completed = 0;
    let mut terminated = false;
    while let Ok(event) = events.try_recv() {
        match event {
            ColonyEvent::RoundCompleted { tours, .. } => {
                assert_eq!(tours, 3);
                completed += 1;
            }
            ColonyEvent::WorkerTerminated { persisted, .. } => terminated = persisted,
            _ => {}
        }
    }
    assert_eq!(completed, 2);
    assert!(terminated);

    // Terminal phase is sticky
    assert_eq!(worker.tick().await, RoundPhase::Terminated);
}

#[tokio::test]
async fn test_other_workers_do_not_persist() {
    let transport = Arc::new(MockTransport::default());
    let writer = Arc::new(MemoryResultsWriter::new());
    let mut worker = coordinator("ant-02", config(1), transport.clone()).with_writer(writer.clone());

    tick_until(&mut worker, RoundPhase::AwaitingPeers).await;
    assert!(!worker.is_persisting_worker());
    transport.deliver("ant-01", &format!("1 {TOUR_1234} @0"));
    transport.deliver("ant-03", &format!("1 {TOUR_1243} @0"));
    worker.drain_inbox();
    worker.tick().await;

    assert!(worker.is_terminated());
    assert!(!worker.report().persisted);
    assert!(writer.pheromone_writes().await.is_empty());
}

#[tokio::test]
async fn test_future_round_status_is_held_back() {
    let transport = Arc::new(MockTransport::default());
    let mut worker = coordinator("ant-01", config(3), transport.clone());
    tick_until(&mut worker, RoundPhase::AwaitingPeers).await;

    // ant-02 is already a round ahead: it must not count for round 0
    transport.deliver("ant-02", &format!("1 {TOUR_1234} @1"));
    transport.deliver("ant-03", &format!("1 {TOUR_1243} @0"));
    worker.drain_inbox();
    assert_eq!(worker.tick().await, RoundPhase::AwaitingPeers);

    transport.deliver("ant-02", &format!("1 {TOUR_1234} @0"));
    worker.drain_inbox();
    assert_eq!(worker.tick().await, RoundPhase::Init);

    // The held status completes ant-02's part of round 1
    worker.tick().await;
    assert!(worker.peers().report(&ant("ant-02"), 1).is_some_and(|r| r.finished));
    assert!(!worker.peers().all_finished(1));
}

#[tokio::test]
async fn test_rejected_statuses() {
    let transport = Arc::new(MockTransport::default());
    let mut worker = coordinator("ant-01", config(3), transport.clone());
    worker.tick().await;

    let status = |sender: &str, payload: &str| Envelope {
        sender: ant(sender),
        conversation: STATUS_CONVERSATION.to_string(),
        payload: payload.to_string(),
    };

    assert_eq!(
        worker.handle_envelope(status("ant-09", "0")),
        Err(ProtocolError::UnknownPeer(ant("ant-09")))
    );
    assert!(matches!(
        worker.handle_envelope(status("ant-02", "1 13 0 6 99 5")),
        Err(ProtocolError::InvalidTour { .. })
    ));
    assert!(matches!(
        worker.handle_envelope(status("ant-02", "1 13 0 6")),
        Err(ProtocolError::InvalidTour { .. })
    ));
    assert!(matches!(
        worker.handle_envelope(status("ant-02", "yes")),
        Err(ProtocolError::MalformedPayload { .. })
    ));

    // Rejections are logged by drain_inbox and never stop the worker
    transport.deliver("ant-09", "0");
    transport.deliver("ant-02", "garbage");
    assert_eq!(worker.drain_inbox(), 2);
    assert_eq!(worker.phase(), RoundPhase::Searching);
}

#[tokio::test]
async fn test_stale_round_is_dropped() {
    let transport = Arc::new(MockTransport::default());
    let mut worker = coordinator("ant-01", config(3), transport.clone());

    tick_until(&mut worker, RoundPhase::AwaitingPeers).await;
    transport.deliver("ant-02", &format!("1 {TOUR_1234} @0"));
    transport.deliver("ant-03", &format!("1 {TOUR_1243} @0"));
    worker.drain_inbox();
    worker.tick().await;
    assert_eq!(worker.round(), 1);

    let late = Envelope {
        sender: ant("ant-03"),
        conversation: STATUS_CONVERSATION.to_string(),
        payload: "0 @0".to_string(),
    };
    assert_eq!(
        worker.handle_envelope(late),
        Err(ProtocolError::StaleRound { worker: ant("ant-03"), round: 0, current: 1 })
    );
}

#[tokio::test]
async fn test_untagged_protocol() {
    let transport = Arc::new(MockTransport::default());
    let untagged = ColonyConfig {
        round_tagging: false,
        ..config(1)
    };
    let mut worker = coordinator("ant-01", untagged, transport.clone());

    tick_until(&mut worker, RoundPhase::AwaitingPeers).await;
    assert_eq!(transport.sent_to("ant-03")[0], "0");
    assert!(!transport.sent_to("ant-03")[1].contains('@'));

    transport.deliver("ant-02", &format!("1 {TOUR_1234}"));
    transport.deliver("ant-03", "0");
    worker.drain_inbox();
    assert_eq!(worker.tick().await, RoundPhase::AwaitingPeers);

    transport.deliver("ant-03", &format!("1 {TOUR_1243}"));
    worker.drain_inbox();
    assert_eq!(worker.tick().await, RoundPhase::Terminated);
}

#[test]
fn test_directory_down_from_the_start_runs_alone() {
    let transport = Arc::new(MockTransport::default());
    let mut worker = RoundCoordinator::new(
        ant("ant-01"),
        environment(),
        parameters(config(1)),
        Arc::new(FailingDirectory),
        transport.clone(),
    )
    .with_seed(1);

    // Empty roster: the worker completes rounds on its own
    tokio_test::block_on(async {
        let report = worker.run_until_terminated().await;
        assert_eq!(report.rounds_completed, 1);
        assert!(report.best_tour.is_some());
    });
    assert!(transport.sent.lock().is_empty());
}

#[tokio::test]
async fn test_directory_failure_keeps_last_roster() {
    let transport = Arc::new(MockTransport::default());
    let directory = Arc::new(FlakyDirectory {
        workers: vec![ant("ant-01"), ant("ant-02"), ant("ant-03")],
        calls: AtomicUsize::new(0),
    });
    let mut worker = RoundCoordinator::new(
        ant("ant-01"),
        environment(),
        parameters(config(3)),
        directory.clone(),
        transport.clone(),
    )
    .with_seed(7);

    tick_until(&mut worker, RoundPhase::AwaitingPeers).await;
    transport.deliver("ant-02", &format!("1 {TOUR_1234} @0"));
    transport.deliver("ant-03", &format!("1 {TOUR_1243} @0"));
    worker.drain_inbox();
    assert_eq!(worker.tick().await, RoundPhase::Init);

    // Second refresh fails; round 1 still announces itself to both peers
    assert_eq!(worker.tick().await, RoundPhase::Searching);
    assert_eq!(directory.calls.load(Ordering::SeqCst), 2);
    for peer in ["ant-02", "ant-03"] {
        assert_eq!(transport.sent_to(peer)[2], "0 @1");
    }

    tick_until(&mut worker, RoundPhase::AwaitingPeers).await;
    transport.deliver("ant-02", &format!("1 {TOUR_1234} @1"));
    worker.drain_inbox();
    for _ in 0..5 {
        assert_eq!(worker.tick().await, RoundPhase::AwaitingPeers);
    }
    assert_eq!(worker.round(), 1);

    transport.deliver("ant-03", &format!("1 {TOUR_1243} @1"));
    worker.drain_inbox();
    assert_eq!(worker.tick().await, RoundPhase::Init);
    assert_eq!(worker.round(), 2);
}

#[tokio::test]
async fn test_random_origin_mode() {
    let transport = Arc::new(MockTransport::default());
    let random = ColonyConfig {
        origin_mode: antcolony_core::domain::colony_config::OriginMode::RandomPerRound,
        ..config(3)
    };
    let mut worker = coordinator("ant-01", random, transport.clone());

    tick_until(&mut worker, RoundPhase::AwaitingPeers).await;
    let origin = worker.origin();
    let own = worker.own_tour().cloned().unwrap();
    assert_eq!(own.validate(&environment().graph, origin), Ok(()));

    let table = PheromoneTable::filled(12, 1.0);
    assert_eq!(worker.pheromone(), &table);
}
