// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # In-Process Message Transport
//!
//! [`MessageHub`] owns one unbounded tokio mailbox per worker. Each worker
//! talks through its own [`MailboxTransport`], which implements the
//! non-blocking `send` / `try_receive` contract of the round coordinator.
//!
//! Delivery between two workers is reliable and FIFO. `try_receive` filters
//! by conversation tag; messages of other conversations are held back for a
//! later poll instead of being dropped.

use antcolony_core::domain::collaborator::{Envelope, MessageTransport, TransportError};
use antcolony_core::domain::status::WorkerId;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Default)]
pub struct MessageHub {
    mailboxes: RwLock<HashMap<WorkerId, mpsc::UnboundedSender<Envelope>>>,
}

impl MessageHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create (or replace) the mailbox of `worker` and return its transport.
    pub fn open_mailbox(self: &Arc<Self>, worker: WorkerId) -> MailboxTransport {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.mailboxes.write().insert(worker.clone(), sender);
        debug!(worker = %worker, "Mailbox opened");
        MailboxTransport {
            worker,
            hub: Arc::clone(self),
            receiver: Mutex::new(receiver),
            held: Mutex::new(VecDeque::new()),
        }
    }

    /// Remove the mailbox of `worker`. Later sends to it fail.
    pub fn close_mailbox(&self, worker: &WorkerId) -> bool {
        self.mailboxes.write().remove(worker).is_some()
    }

    pub fn is_open(&self, worker: &WorkerId) -> bool {
        self.mailboxes.read().contains_key(worker)
    }

    fn deliver(&self, envelope: Envelope, target: &WorkerId) -> Result<(), TransportError> {
        let mailboxes = self.mailboxes.read();
        let mailbox = mailboxes
            .get(target)
            .ok_or_else(|| TransportError::UnknownRecipient(target.clone()))?;
        mailbox
            .send(envelope)
            .map_err(|_| TransportError::Closed(target.clone()))
    }
}

/// One worker's end of the hub.
pub struct MailboxTransport {
    worker: WorkerId,
    hub: Arc<MessageHub>,
    receiver: Mutex<mpsc::UnboundedReceiver<Envelope>>,
    /// Received envelopes of conversations nobody has polled for yet.
    held: Mutex<VecDeque<Envelope>>,
}

impl MailboxTransport {
    pub fn worker(&self) -> &WorkerId {
        &self.worker
    }
}

impl MessageTransport for MailboxTransport {
    fn send(&self, target: &WorkerId, conversation: &str, payload: &str) -> Result<(), TransportError> {
        self.hub.deliver(
            Envelope {
                sender: self.worker.clone(),
                conversation: conversation.to_string(),
                payload: payload.to_string(),
            },
            target,
        )
    }

    fn try_receive(&self, conversation: &str) -> Option<Envelope> {
        let mut held = self.held.lock();
        if let Some(position) = held.iter().position(|e| e.conversation == conversation) {
            return held.remove(position);
        }

        let mut receiver = self.receiver.lock();
        while let Ok(envelope) = receiver.try_recv() {
            if envelope.conversation == conversation {
                return Some(envelope);
            }
            held.push_back(envelope);
        }
        None
    }
}
