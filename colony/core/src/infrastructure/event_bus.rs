// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Colony Events
//
// In-memory event streaming over a tokio broadcast channel. Round
// coordinators publish lifecycle events; the CLI and tests observe them.
// Events are not persisted.

use crate::domain::events::ColonyEvent;
use crate::domain::status::WorkerId;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Event bus for publishing and subscribing to colony events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<ColonyEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity.
    /// Slow receivers lose the oldest events once the buffer is full.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish(&self, event: ColonyEvent) {
        debug!("Publishing event: {:?}", event);

        // send() only fails when nobody is listening
        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all colony events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to the events of a single worker
    pub fn subscribe_worker(&self, worker: WorkerId) -> WorkerEventReceiver {
        WorkerEventReceiver {
            receiver: self.sender.subscribe(),
            worker,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Receiver for all colony events
pub struct EventReceiver {
    receiver: broadcast::Receiver<ColonyEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<ColonyEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<ColonyEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver filtered to one worker's events
pub struct WorkerEventReceiver {
    receiver: broadcast::Receiver<ColonyEvent>,
    worker: WorkerId,
}

impl WorkerEventReceiver {
    pub async fn recv(&mut self) -> Result<ColonyEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if event.worker() == &self.worker {
                return Ok(event);
            }
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::CityId;
    use chrono::Utc;

    fn started(worker: &str, round: u64) -> ColonyEvent {
        ColonyEvent::RoundStarted {
            worker: WorkerId::new(worker),
            round,
            origin: CityId(1),
            started_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        event_bus.publish(started("ant-01", 0));

        match receiver.recv().await.unwrap() {
            ColonyEvent::RoundStarted { worker, round, .. } => {
                assert_eq!(worker, WorkerId::new("ant-01"));
                assert_eq!(round, 0);
            }
            other => panic!("Wrong event type received: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_worker_event_filtering() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe_worker(WorkerId::new("ant-02"));

        event_bus.publish(started("ant-01", 0));
        event_bus.publish(started("ant-02", 4));

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.worker(), &WorkerId::new("ant-02"));
        assert!(matches!(event, ColonyEvent::RoundStarted { round: 4, .. }));
    }

    #[test]
    fn test_try_recv_empty_and_lagged() {
        let event_bus = EventBus::new(2);
        let mut receiver = event_bus.subscribe();
        assert!(matches!(receiver.try_recv(), Err(EventBusError::Empty)));

        for round in 0..5 {
            event_bus.publish(started("ant-01", round));
        }
        assert!(matches!(receiver.try_recv(), Err(EventBusError::Lagged(3))));
        assert!(receiver.try_recv().is_ok());
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let event_bus = EventBus::default();
        assert_eq!(event_bus.subscriber_count(), 0);
        event_bus.publish(started("ant-01", 0));
    }
}
