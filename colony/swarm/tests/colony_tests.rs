// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use antcolony_core::domain::colony_config::{ColonyConfig, OriginMode};
use antcolony_core::domain::events::ColonyEvent;
use antcolony_core::domain::graph::{CityGraph, CityId, ColonyEnvironment, Road};
use antcolony_core::domain::status::{WorkerId, TOUR_FINDING_SERVICE};
use antcolony_core::infrastructure::event_bus::EventBus;
use antcolony_core::infrastructure::results_writer::MemoryResultsWriter;
use antcolony_swarm::Colony;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn complete_graph(n: u32) -> Arc<ColonyEnvironment> {
    let mut roads = Vec::new();
    for a in 1..=n {
        for b in (a + 1)..=n {
            roads.push(Road::new(a, b, ((a * 7 + b * 3) % 11 + 1) as f64));
        }
    }
    Arc::new(ColonyEnvironment {
        graph: CityGraph::from_undirected(n as usize, roads).unwrap(),
        origin: CityId(1),
        beta: 2.0,
        decay: Some(0.2),
    })
}

fn config(workers: usize, rounds: u64) -> ColonyConfig {
    ColonyConfig {
        workers,
        rounds,
        seed: Some(42),
        ..ColonyConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tagged_colony_converges_and_persists_once() {
    let writer = Arc::new(MemoryResultsWriter::new());
    let colony = Colony::new().with_writer(writer.clone());

    let outcome = timeout(Duration::from_secs(30), colony.run(complete_graph(6), &config(3, 8)))
        .await
        .expect("colony did not finish")
        .unwrap();

    assert_eq!(outcome.reports.len(), 3);
    for report in &outcome.reports {
        assert_eq!(report.rounds_completed, 8);
        assert_eq!(report.rounds_abandoned, 0);
        assert!(report.best_tour.is_some());
    }
    assert!(outcome.pheromone_converged());
    assert_eq!(outcome.persisted_by(), Some(&WorkerId::new("ant-01")));
    assert_eq!(outcome.reports.iter().filter(|r| r.persisted).count(), 1);
    assert_eq!(writer.pheromone_writes().await.len(), 1);
    assert_eq!(writer.tour_writes().await.len(), 1);

    // Colony is taken down afterwards
    assert!(colony.directory().members(TOUR_FINDING_SERVICE).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_untagged_colony_terminates() {
    let writer = Arc::new(MemoryResultsWriter::new());
    let colony = Colony::new().with_writer(writer.clone());
    let untagged = ColonyConfig {
        round_tagging: false,
        ..config(3, 5)
    };

    let outcome = timeout(Duration::from_secs(30), colony.run(complete_graph(5), &untagged))
        .await
        .expect("colony did not finish")
        .unwrap();

    assert!(outcome.reports.iter().all(|r| r.rounds_completed == 5));
    assert_eq!(outcome.reports.iter().filter(|r| r.persisted).count(), 1);
    assert_eq!(writer.tour_writes().await.len(), 1);
}

#[tokio::test]
async fn test_random_origins_on_a_single_thread() {
    let colony = Colony::new();
    let random = ColonyConfig {
        origin_mode: OriginMode::RandomPerRound,
        initial_pheromone: 0.5,
        ..config(4, 4)
    };
    let environment = complete_graph(6);

    let outcome = timeout(Duration::from_secs(30), colony.run(environment.clone(), &random))
        .await
        .expect("colony did not finish")
        .unwrap();

    assert!(outcome.pheromone_converged());
    let best = outcome.best_tour().unwrap();
    let origin = best.origin(&environment.graph).unwrap();
    assert_eq!(best.validate(&environment.graph, origin), Ok(()));
    // No writer attached: nothing to persist
    assert_eq!(outcome.persisted_by(), None);
}

#[tokio::test]
async fn test_events_cover_every_round() {
    let bus = EventBus::new(1_000);
    let mut events = bus.subscribe();
    let colony = Colony::new().with_event_bus(bus);

    colony.run(complete_graph(4), &config(2, 3)).await.unwrap();

    let mut completed = 0;
    let mut terminated = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            ColonyEvent::RoundCompleted { tours, .. } => {
                assert_eq!(tours, 2);
                completed += 1;
            }
            ColonyEvent::WorkerTerminated { worker, rounds_completed, .. } => {
                assert_eq!(rounds_completed, 3);
                terminated.push(worker);
            }
            _ => {}
        }
    }
    assert_eq!(completed, 6);
    terminated.sort();
    assert_eq!(terminated, vec![WorkerId::new("ant-01"), WorkerId::new("ant-02")]);
}

#[tokio::test]
async fn test_invalid_configuration_is_rejected() {
    let colony = Colony::new();
    let bad = ColonyConfig {
        decay: Some(1.5),
        ..config(2, 2)
    };

    assert!(colony.run(complete_graph(4), &bad).await.is_err());
    assert!(colony.directory().members(TOUR_FINDING_SERVICE).is_empty());
}

#[tokio::test]
async fn test_outcome_serializes() {
    let outcome = Colony::new()
        .run(complete_graph(4), &config(1, 1))
        .await
        .unwrap();

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["reports"][0]["worker"], "ant-01");
    assert_eq!(json["reports"][0]["rounds_completed"], 1);
}
