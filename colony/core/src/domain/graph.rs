// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # City Graph
//!
//! Immutable road network shared read-only by every worker in a colony.
//!
//! | Type | Role |
//! |------|------|
//! | [`CityId`] | City label in `[1, city_count]` |
//! | [`EdgeIndex`] | Position of a [`Road`] in the flattened edge list |
//! | [`Road`] | Directed edge `(source, target, length)` |
//! | [`CityGraph`] | Edge list plus per-city outgoing index |
//! | [`ColonyEnvironment`] | Graph together with the header parameters of a graph file |
//!
//! ## Edge layout
//!
//! Every undirected road `{a, b}` is stored as two directed roads at
//! consecutive indices: `(a, b)` at `2k` and `(b, a)` at `2k + 1`. Paths and
//! pheromone tables address roads only through [`EdgeIndex`], so the layout is
//! part of the contract: `reverse_edge(e) == e ^ 1` and both directions share
//! the undirected id `e / 2`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// City label. Valid labels are `1..=city_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CityId(pub u32);

impl CityId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Zero-based slot for per-city arrays.
    pub(crate) fn slot(self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }
}

impl fmt::Display for CityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical identifier of "which road was taken".
pub type EdgeIndex = usize;

/// Directed road between two cities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Road {
    pub source: CityId,
    pub target: CityId,
    pub length: f64,
}

impl Road {
    pub fn new(source: u32, target: u32, length: f64) -> Self {
        Self {
            source: CityId(source),
            target: CityId(target),
            length,
        }
    }

    /// The same road travelled in the opposite direction.
    pub fn reversed(&self) -> Self {
        Self {
            source: self.target,
            target: self.source,
            length: self.length,
        }
    }
}

impl fmt::Display for Road {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.source, self.target, self.length)
    }
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("malformed graph input at line {line}: {reason}")]
    MalformedInput { line: usize, reason: String },

    #[error("graph must contain at least one city")]
    Empty,

    #[error("city {city} is outside [1, {city_count}]")]
    CityOutOfRange { city: CityId, city_count: usize },

    #[error("road {from} -> {to} has non-positive length {length}")]
    NonPositiveLength { from: CityId, to: CityId, length: f64 },

    #[error("road {city} -> {city} is a self loop")]
    SelfLoop { city: CityId },

    #[error("graph declares {0} cities, more than city labels can address")]
    TooManyCities(usize),

    #[error("failed to read graph: {0}")]
    Io(#[from] std::io::Error),
}

/// Road network over cities `1..=city_count`, stored as a directed edge list
/// that represents an undirected graph.
///
/// # Invariants
///
/// - For every road `(a, b, l)` at index `e`, road `e ^ 1` is `(b, a, l)`.
/// - Every road length is finite and strictly positive.
/// - No road starts and ends at the same city.
/// - `city_count` fits in a `u32`, so every city has a [`CityId`].
#[derive(Debug, Clone, PartialEq)]
pub struct CityGraph {
    city_count: usize,
    roads: Vec<Road>,
    outgoing: Vec<Vec<EdgeIndex>>,
}

impl CityGraph {
    /// Build a graph from undirected roads, inserting both directions of each.
    pub fn from_undirected(
        city_count: usize,
        roads: impl IntoIterator<Item = Road>,
    ) -> Result<Self, GraphError> {
        if city_count == 0 {
            return Err(GraphError::Empty);
        }
        if city_count > u32::MAX as usize {
            return Err(GraphError::TooManyCities(city_count));
        }

        let mut graph = Self {
            city_count,
            roads: Vec::new(),
            outgoing: vec![Vec::new(); city_count],
        };

        for road in roads {
            graph.check_road(&road)?;
            for directed in [road, road.reversed()] {
                let index = graph.roads.len();
                graph.outgoing[directed.source.slot()].push(index);
                graph.roads.push(directed);
            }
        }

        Ok(graph)
    }

    fn check_road(&self, road: &Road) -> Result<(), GraphError> {
        for city in [road.source, road.target] {
            if !self.contains(city) {
                return Err(GraphError::CityOutOfRange {
                    city,
                    city_count: self.city_count,
                });
            }
        }
        if road.source == road.target {
            return Err(GraphError::SelfLoop { city: road.source });
        }
        if !road.length.is_finite() || road.length <= 0.0 {
            return Err(GraphError::NonPositiveLength {
                from: road.source,
                to: road.target,
                length: road.length,
            });
        }
        Ok(())
    }

    pub fn city_count(&self) -> usize {
        self.city_count
    }

    pub fn edge_count(&self) -> usize {
        self.roads.len()
    }

    pub fn contains(&self, city: CityId) -> bool {
        city.0 >= 1 && (city.0 as usize) <= self.city_count
    }

    pub fn cities(&self) -> impl Iterator<Item = CityId> {
        (1..=self.city_count as u32).map(CityId)
    }

    /// All roads in edge-index order.
    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    pub fn road(&self, index: EdgeIndex) -> Option<&Road> {
        self.roads.get(index)
    }

    /// Indices of the roads leaving `city`, in insertion order.
    pub fn edges_from(&self, city: CityId) -> &[EdgeIndex] {
        if !self.contains(city) {
            return &[];
        }
        &self.outgoing[city.slot()]
    }

    /// Index of the same road in the opposite direction.
    pub fn reverse_edge(&self, index: EdgeIndex) -> EdgeIndex {
        index ^ 1
    }

    /// Identifier shared by both directions of a road.
    pub fn undirected_id(&self, index: EdgeIndex) -> usize {
        index / 2
    }

    /// Sum of the lengths of `edges`, or `None` if any index is out of range.
    pub fn path_length(&self, edges: &[EdgeIndex]) -> Option<f64> {
        edges
            .iter()
            .map(|&e| self.roads.get(e).map(|road| road.length))
            .sum()
    }
}

/// Parsed graph file: the graph plus the header parameters that travel with it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColonyEnvironment {
    pub graph: CityGraph,
    pub origin: CityId,
    pub beta: f64,
    /// Evaporation rate, present only in the four-token header variant.
    pub decay: Option<f64>,
}
