// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Completed Hamiltonian cycles.

use crate::domain::graph::{CityGraph, CityId, EdgeIndex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TourError {
    #[error("tour has no edges")]
    Empty,

    #[error("edge {0} is not part of the graph")]
    EdgeOutOfRange(EdgeIndex),

    #[error("tour starts at {found}, expected {expected}")]
    WrongOrigin { expected: CityId, found: CityId },

    #[error("edge {edge} does not continue from city {city}")]
    Disconnected { edge: EdgeIndex, city: CityId },

    #[error("tour ends at {0} instead of returning to its origin")]
    NotClosed(CityId),

    #[error("city {0} is visited more than once")]
    CityRevisited(CityId),

    #[error("tour visits {visited} of {city_count} cities")]
    Incomplete { visited: usize, city_count: usize },
}

/// Ordered edge sequence of a Hamiltonian cycle together with its length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tour {
    edges: Vec<EdgeIndex>,
    length: f64,
}

impl Tour {
    /// Tour with a length reported by someone else (e.g. a peer's status).
    pub fn new(edges: Vec<EdgeIndex>, length: f64) -> Self {
        Self { edges, length }
    }

    /// Tour whose length is summed from `graph`.
    pub fn from_edges(graph: &CityGraph, edges: Vec<EdgeIndex>) -> Result<Self, TourError> {
        if let Some(&bad) = edges.iter().find(|&&e| e >= graph.edge_count()) {
            return Err(TourError::EdgeOutOfRange(bad));
        }
        let length = graph.path_length(&edges).unwrap_or_default();
        Ok(Self { edges, length })
    }

    pub fn edges(&self) -> &[EdgeIndex] {
        &self.edges
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn contains_edge(&self, edge: EdgeIndex) -> bool {
        self.edges.contains(&edge)
    }

    pub fn is_shorter_than(&self, other: &Self) -> bool {
        self.length < other.length
    }

    /// City the tour starts from and returns to.
    pub fn origin(&self, graph: &CityGraph) -> Option<CityId> {
        self.edges
            .first()
            .and_then(|&e| graph.road(e))
            .map(|road| road.source)
    }

    /// Cities in visiting order, starting at the origin (not repeated at the end).
    pub fn cities(&self, graph: &CityGraph) -> Vec<CityId> {
        self.edges
            .iter()
            .filter_map(|&e| graph.road(e))
            .map(|road| road.source)
            .collect()
    }

    /// Check that the edges form a Hamiltonian cycle through `origin`.
    pub fn validate(&self, graph: &CityGraph, origin: CityId) -> Result<(), TourError> {
        let Some(&first) = self.edges.first() else {
            return Err(TourError::Empty);
        };
        let first_road = graph.road(first).ok_or(TourError::EdgeOutOfRange(first))?;
        if first_road.source != origin {
            return Err(TourError::WrongOrigin {
                expected: origin,
                found: first_road.source,
            });
        }

        let mut seen = vec![false; graph.city_count()];
        let mut current = origin;
        for &edge in &self.edges {
            let road = graph.road(edge).ok_or(TourError::EdgeOutOfRange(edge))?;
            if road.source != current {
                return Err(TourError::Disconnected { edge, city: current });
            }
            let slot = road.source.slot();
            if seen[slot] {
                return Err(TourError::CityRevisited(road.source));
            }
            seen[slot] = true;
            current = road.target;
        }

        if current != origin {
            return Err(TourError::NotClosed(current));
        }
        let visited = seen.iter().filter(|&&v| v).count();
        if visited != graph.city_count() {
            return Err(TourError::Incomplete {
                visited,
                city_count: graph.city_count(),
            });
        }
        Ok(())
    }
}
