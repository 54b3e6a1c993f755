// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Per-city visit bookkeeping for backtracking search.
//!
//! A [`VisitMask`] is cloned at every branch point, so it stays a flat vector
//! of one-byte states.

use crate::domain::graph::CityId;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitState {
    Unvisited,
    Visited,
    /// The origin before the closing move back to it.
    OriginOpen,
    /// The origin after the closing move; the cycle is closed.
    OriginClosed,
}

impl VisitState {
    fn symbol(self) -> char {
        match self {
            Self::Unvisited => '0',
            Self::Visited => '1',
            Self::OriginOpen => 'o',
            Self::OriginClosed => '2',
        }
    }
}

/// Visit state of every city on one partial path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VisitMask {
    states: Vec<VisitState>,
    origin: CityId,
    /// Non-origin cities still unvisited.
    remaining: usize,
}

impl VisitMask {
    /// Fresh mask for a path that starts at `origin`.
    pub fn new(city_count: usize, origin: CityId) -> Self {
        let mut states = vec![VisitState::Unvisited; city_count];
        let mut remaining = city_count;
        if let Some(state) = slot_of(origin).and_then(|slot| states.get_mut(slot)) {
            *state = VisitState::OriginOpen;
            remaining -= 1;
        }
        Self {
            states,
            origin,
            remaining,
        }
    }

    pub fn origin(&self) -> CityId {
        self.origin
    }

    pub fn state(&self, city: CityId) -> Option<VisitState> {
        slot_of(city).and_then(|slot| self.states.get(slot)).copied()
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Whether moving into `target` keeps the path extendable to a
    /// Hamiltonian cycle: an unvisited non-origin city, or the origin once
    /// every other city has been visited.
    pub fn is_feasible(&self, target: CityId) -> bool {
        match self.state(target) {
            Some(VisitState::Unvisited) => target != self.origin,
            Some(VisitState::OriginOpen) => self.remaining == 0,
            _ => false,
        }
    }

    /// Record a move into `target`. Callers check [`Self::is_feasible`] first.
    pub fn visit(&mut self, target: CityId) {
        debug_assert!(self.is_feasible(target), "infeasible move into {target}");
        let Some(state) = slot_of(target).and_then(|slot| self.states.get_mut(slot)) else {
            return;
        };
        if target == self.origin {
            *state = VisitState::OriginClosed;
        } else if *state == VisitState::Unvisited {
            *state = VisitState::Visited;
            self.remaining -= 1;
        }
    }

    /// Tour condition: every city visited, the origin closed, and the walker
    /// standing on the origin.
    pub fn is_complete(&self, current: CityId) -> bool {
        current == self.origin
            && self.remaining == 0
            && self.state(self.origin) == Some(VisitState::OriginClosed)
    }
}

fn slot_of(city: CityId) -> Option<usize> {
    (city.get() as usize).checked_sub(1)
}

impl fmt::Display for VisitMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for state in &self.states {
            write!(f, "{}", state.symbol())?;
        }
        Ok(())
    }
}
