// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Tour Constructor
//!
//! Backtracking depth-first search for Hamiltonian cycles, in two modes that
//! share the feasibility rule of [`VisitMask`]:
//!
//! - [`StochasticSearch`] samples one next edge per step with the
//!   random-proportional rule and backtracks on dead ends. It advances one
//!   edge (or one backtrack) per [`StochasticSearch::step`] so the caller can
//!   interleave message handling between steps.
//! - [`enumerate_tours`] explores every feasible edge at every branch point
//!   and reports each completed cycle. The reference solver is built on it.

use crate::application::transition::sample_edge;
use crate::domain::graph::{CityGraph, CityId, EdgeIndex};
use crate::domain::pheromone::PheromoneTable;
use crate::domain::tour::Tour;
use crate::domain::visit::VisitMask;
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SearchError {
    #[error("no Hamiltonian cycle reachable from city {origin}: every alternative was exhausted")]
    DeadEnd { origin: CityId },
}

/// Roads leaving `current` whose target the mask allows next.
pub fn feasible_edges(graph: &CityGraph, mask: &VisitMask, current: CityId) -> Vec<EdgeIndex> {
    graph
        .edges_from(current)
        .iter()
        .copied()
        .filter(|&edge| {
            graph
                .road(edge)
                .is_some_and(|road| mask.is_feasible(road.target))
        })
        .collect()
}

/// One entry of the backtracking stack.
#[derive(Debug, Clone)]
struct SearchFrame {
    city: CityId,
    mask: VisitMask,
    /// Edge that led here; `None` for the origin frame.
    via: Option<EdgeIndex>,
    /// Feasible continuations not tried yet from this frame.
    untried: Vec<EdgeIndex>,
}

/// Outcome of a single [`StochasticSearch::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum SearchStep {
    /// Moved along `edge`; the path now holds `depth` edges.
    Advanced { edge: EdgeIndex, depth: usize },
    /// Dropped the last edge; the path now holds `depth` edges.
    Backtracked { depth: usize },
    Completed(Tour),
    /// Every alternative from the origin failed.
    Exhausted,
}

/// Incremental weighted backtracking search for one round.
#[derive(Debug, Clone)]
pub struct StochasticSearch {
    origin: CityId,
    stack: Vec<SearchFrame>,
    completed: Option<Tour>,
    steps: u64,
}

impl StochasticSearch {
    /// Seed the stack with every feasible first edge from `origin`.
    pub fn new(graph: &CityGraph, origin: CityId) -> Self {
        let mask = VisitMask::new(graph.city_count(), origin);
        let untried = if graph.contains(origin) {
            feasible_edges(graph, &mask, origin)
        } else {
            Vec::new()
        };
        Self {
            origin,
            stack: vec![SearchFrame {
                city: origin,
                mask,
                via: None,
                untried,
            }],
            completed: None,
            steps: 0,
        }
    }

    pub fn origin(&self) -> CityId {
        self.origin
    }

    /// Number of [`Self::step`] calls that changed the search state.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Edges of the current partial path.
    pub fn path(&self) -> Vec<EdgeIndex> {
        self.stack.iter().filter_map(|frame| frame.via).collect()
    }

    pub fn current_city(&self) -> Option<CityId> {
        self.stack.last().map(|frame| frame.city)
    }

    pub fn step<R: Rng + ?Sized>(
        &mut self,
        graph: &CityGraph,
        pheromone: &PheromoneTable,
        beta: f64,
        rng: &mut R,
    ) -> SearchStep {
        if let Some(tour) = &self.completed {
            return SearchStep::Completed(tour.clone());
        }
        let Some(top) = self.stack.last_mut() else {
            return SearchStep::Exhausted;
        };
        self.steps += 1;

        let Some(position) = sample_edge(graph.roads(), &top.untried, pheromone, beta, rng) else {
            self.stack.pop();
            return if self.stack.is_empty() {
                SearchStep::Exhausted
            } else {
                SearchStep::Backtracked {
                    depth: self.stack.len() - 1,
                }
            };
        };

        let edge = top.untried.remove(position);
        let Some(road) = graph.road(edge) else {
            // Unreachable for edges produced by feasible_edges
            return SearchStep::Backtracked {
                depth: self.stack.len() - 1,
            };
        };
        let mut mask = top.mask.clone();
        mask.visit(road.target);

        let complete = mask.is_complete(road.target);
        let untried = if complete {
            Vec::new()
        } else {
            feasible_edges(graph, &mask, road.target)
        };
        self.stack.push(SearchFrame {
            city: road.target,
            mask,
            via: Some(edge),
            untried,
        });

        if complete {
            let path = self.path();
            let length = graph.path_length(&path).unwrap_or_default();
            let tour = Tour::new(path, length);
            self.completed = Some(tour.clone());
            return SearchStep::Completed(tour);
        }

        SearchStep::Advanced {
            edge,
            depth: self.stack.len() - 1,
        }
    }

    /// Step until a tour is found or the search space is exhausted.
    pub fn run_to_completion<R: Rng + ?Sized>(
        &mut self,
        graph: &CityGraph,
        pheromone: &PheromoneTable,
        beta: f64,
        rng: &mut R,
    ) -> Result<Tour, SearchError> {
        loop {
            match self.step(graph, pheromone, beta, rng) {
                SearchStep::Completed(tour) => return Ok(tour),
                SearchStep::Exhausted => return Err(SearchError::DeadEnd { origin: self.origin }),
                SearchStep::Advanced { .. } | SearchStep::Backtracked { .. } => {}
            }
        }
    }
}

/// Partial path waiting on the exhaustive stack.
struct PartialPath {
    city: CityId,
    mask: VisitMask,
    path: Vec<EdgeIndex>,
    length: f64,
}

/// Visit every Hamiltonian cycle through `origin`, calling `on_tour` with
/// its edges and length. Returns the number of (directed) cycles visited.
pub fn enumerate_tours<F>(graph: &CityGraph, origin: CityId, mut on_tour: F) -> usize
where
    F: FnMut(&[EdgeIndex], f64),
{
    if !graph.contains(origin) {
        return 0;
    }

    let mut count = 0;
    let mut stack = vec![PartialPath {
        city: origin,
        mask: VisitMask::new(graph.city_count(), origin),
        path: Vec::new(),
        length: 0.0,
    }];

    while let Some(partial) = stack.pop() {
        if !partial.path.is_empty() && partial.mask.is_complete(partial.city) {
            on_tour(&partial.path, partial.length);
            count += 1;
            continue;
        }

        // Reverse so branches are explored in edge order
        for edge in feasible_edges(graph, &partial.mask, partial.city).into_iter().rev() {
            let Some(road) = graph.road(edge) else {
                continue;
            };
            let mut mask = partial.mask.clone();
            mask.visit(road.target);
            let mut path = Vec::with_capacity(partial.path.len() + 1);
            path.extend_from_slice(&partial.path);
            path.push(edge);
            stack.push(PartialPath {
                city: road.target,
                mask,
                path,
                length: partial.length + road.length,
            });
        }
    }

    count
}
