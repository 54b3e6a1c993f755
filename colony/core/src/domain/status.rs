// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Worker Status Protocol
//!
//! Workers tell each other when they start a round and when they finish it.
//! The payload is a short whitespace-separated string:
//!
//! ```text
//! <finished:0|1> [<tour_length> <edge_index>*] [@<round>]
//! ```
//!
//! The length/edge suffix is present only when `finished = 1`. The trailing
//! `@<round>` token is optional; untagged payloads are attributed to the
//! receiver's current round.

use crate::domain::graph::EdgeIndex;
use crate::domain::tour::Tour;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Conversation tag of status updates.
pub const STATUS_CONVERSATION: &str = "neighbor-status-update";

/// Directory service tag under which tour-finding workers register.
pub const TOUR_FINDING_SERVICE: &str = "tour-finding";

const ROUND_MARKER: char = '@';

/// Stable, sortable worker identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("status from unknown peer {0}")]
    UnknownPeer(WorkerId),

    #[error("malformed status payload {payload:?}: {reason}")]
    MalformedPayload { payload: String, reason: String },

    #[error("status from {worker} carries an invalid tour: {reason}")]
    InvalidTour { worker: WorkerId, reason: String },

    #[error("stale status from {worker} for round {round} (current round {current})")]
    StaleRound {
        worker: WorkerId,
        round: u64,
        current: u64,
    },
}

/// One worker's announcement about its current round.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerStatus {
    pub worker: WorkerId,
    pub finished: bool,
    /// Completed tour, present only when `finished`.
    pub tour: Option<Tour>,
    pub round: Option<u64>,
}

impl WorkerStatus {
    pub fn started(worker: WorkerId, round: Option<u64>) -> Self {
        Self {
            worker,
            finished: false,
            tour: None,
            round,
        }
    }

    pub fn finished(worker: WorkerId, tour: Tour, round: Option<u64>) -> Self {
        Self {
            worker,
            finished: true,
            tour: Some(tour),
            round,
        }
    }

    /// Render the wire payload. The sender travels in the transport envelope.
    pub fn encode(&self) -> String {
        let mut tokens: Vec<String> = Vec::new();
        match (&self.tour, self.finished) {
            (Some(tour), true) => {
                tokens.push("1".to_string());
                tokens.push(tour.length().to_string());
                tokens.extend(tour.edges().iter().map(|e| e.to_string()));
            }
            _ => tokens.push("0".to_string()),
        }
        if let Some(round) = self.round {
            tokens.push(format!("{ROUND_MARKER}{round}"));
        }
        tokens.join(" ")
    }

    /// Parse a payload received from `sender`.
    pub fn decode(sender: WorkerId, payload: &str) -> Result<Self, ProtocolError> {
        let malformed = |reason: &str| ProtocolError::MalformedPayload {
            payload: payload.to_string(),
            reason: reason.to_string(),
        };

        let mut tokens: Vec<&str> = payload.split_whitespace().collect();

        let round = match tokens.last() {
            Some(last) if last.starts_with(ROUND_MARKER) => {
                let round = last[ROUND_MARKER.len_utf8()..]
                    .parse::<u64>()
                    .map_err(|_| malformed("round tag is not an unsigned integer"))?;
                tokens.pop();
                Some(round)
            }
            _ => None,
        };

        let (flag, rest) = tokens
            .split_first()
            .ok_or_else(|| malformed("empty payload"))?;

        match *flag {
            "0" if rest.is_empty() => Ok(Self::started(sender, round)),
            "0" => Err(malformed("unfinished status must not carry a tour")),
            "1" => {
                let (length, edges) = rest
                    .split_first()
                    .ok_or_else(|| malformed("finished status is missing the tour length"))?;
                let length = length
                    .parse::<f64>()
                    .map_err(|_| malformed("tour length is not a number"))?;
                if !length.is_finite() || length <= 0.0 {
                    return Err(malformed("tour length must be finite and positive"));
                }
                if edges.is_empty() {
                    return Err(malformed("finished status has no edges"));
                }
                let edges = edges
                    .iter()
                    .map(|e| e.parse::<EdgeIndex>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| malformed("edge index is not an unsigned integer"))?;
                Ok(Self::finished(sender, Tour::new(edges, length), round))
            }
            _ => Err(malformed("finished flag must be 0 or 1")),
        }
    }
}
