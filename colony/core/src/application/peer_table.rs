// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Peer roster and per-round status bookkeeping of one worker.
//!
//! Keyed by [`WorkerId`], so roster changes never shift anyone's slot.
//! Round-tagged statuses are filed under their round; untagged ones replace
//! the peer's latest status and stand in for any round without a tagged
//! entry. Untagged entries survive round boundaries.

use crate::domain::status::{ProtocolError, WorkerId, WorkerStatus};
use crate::domain::tour::Tour;
use std::collections::{BTreeMap, BTreeSet};

/// What a peer last said about a round.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerReport {
    pub finished: bool,
    pub tour: Option<Tour>,
}

impl From<WorkerStatus> for PeerReport {
    fn from(status: WorkerStatus) -> Self {
        Self {
            finished: status.finished,
            tour: status.tour,
        }
    }
}

/// Where an accepted status was filed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Counts towards the receiver's current round.
    Current,
    /// Tagged with a later round; held until the receiver gets there.
    Deferred { round: u64 },
}

#[derive(Debug, Clone, Default)]
pub struct PeerStatusTable {
    roster: BTreeSet<WorkerId>,
    by_round: BTreeMap<(WorkerId, u64), PeerReport>,
    latest: BTreeMap<WorkerId, PeerReport>,
}

impl PeerStatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the roster. Statuses of departed peers are dropped.
    pub fn set_roster(&mut self, peers: impl IntoIterator<Item = WorkerId>) {
        self.roster = peers.into_iter().collect();
        let roster = &self.roster;
        self.by_round.retain(|(worker, _), _| roster.contains(worker));
        self.latest.retain(|worker, _| roster.contains(worker));
    }

    pub fn roster(&self) -> impl Iterator<Item = &WorkerId> {
        self.roster.iter()
    }

    pub fn len(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    pub fn contains(&self, worker: &WorkerId) -> bool {
        self.roster.contains(worker)
    }

    /// File a decoded status received while the receiver is in `current_round`.
    pub fn record(
        &mut self,
        status: WorkerStatus,
        current_round: u64,
    ) -> Result<Admission, ProtocolError> {
        if !self.roster.contains(&status.worker) {
            return Err(ProtocolError::UnknownPeer(status.worker));
        }

        match status.round {
            Some(round) if round < current_round => Err(ProtocolError::StaleRound {
                worker: status.worker,
                round,
                current: current_round,
            }),
            Some(round) => {
                let key = (status.worker.clone(), round);
                self.by_round.insert(key, status.into());
                if round == current_round {
                    Ok(Admission::Current)
                } else {
                    Ok(Admission::Deferred { round })
                }
            }
            None => {
                self.latest.insert(status.worker.clone(), status.into());
                Ok(Admission::Current)
            }
        }
    }

    pub fn report(&self, worker: &WorkerId, round: u64) -> Option<&PeerReport> {
        self.by_round
            .get(&(worker.clone(), round))
            .or_else(|| self.latest.get(worker))
    }

    /// Whether every rostered peer has reported a finished tour for `round`.
    pub fn all_finished(&self, round: u64) -> bool {
        self.roster
            .iter()
            .all(|worker| self.report(worker, round).is_some_and(|r| r.finished))
    }

    /// Rostered peers still owing a finished status for `round`.
    pub fn pending(&self, round: u64) -> Vec<&WorkerId> {
        self.roster
            .iter()
            .filter(|worker| !self.report(worker, round).is_some_and(|r| r.finished))
            .collect()
    }

    /// Finished peer tours for `round`, in worker id order.
    pub fn finished_tours(&self, round: u64) -> Vec<(WorkerId, Tour)> {
        self.roster
            .iter()
            .filter_map(|worker| {
                let report = self.report(worker, round)?;
                let tour = report.tour.as_ref().filter(|_| report.finished)?;
                Some((worker.clone(), tour.clone()))
            })
            .collect()
    }

    /// Forget tagged statuses of rounds before `round`.
    pub fn discard_before(&mut self, round: u64) {
        self.by_round.retain(|(_, r), _| *r >= round);
    }
}
