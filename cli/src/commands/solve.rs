// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `antcolony solve` - exhaustive reference answer for small graphs

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use antcolony_core::application::reference_solver::{find_optimal_tour, ReferenceSolution};
use antcolony_core::domain::graph::{CityId, ColonyEnvironment};
use antcolony_core::infrastructure::graph_loader::GraphLoader;

#[derive(Debug, Args)]
pub struct SolveArgs {
    /// Graph file: header line then one road per line
    #[arg(short, long, value_name = "FILE")]
    pub graph: PathBuf,

    /// Start city (default: origin from the graph header)
    #[arg(long)]
    pub origin: Option<u32>,

    /// Print the solution as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct SolveReport<'a> {
    origin: CityId,
    cities: Vec<CityId>,
    #[serde(flatten)]
    solution: &'a ReferenceSolution,
}

pub async fn handle_command(args: SolveArgs) -> Result<()> {
    let environment = GraphLoader::parse_file(&args.graph)
        .with_context(|| format!("Failed to load graph {}", args.graph.display()))?;
    let origin = args.origin.map(CityId::new).unwrap_or(environment.origin);

    let solution = solve(&environment, origin)?;
    let cities = solution.best_tour.cities(&environment.graph);

    if args.json {
        let report = SolveReport {
            origin,
            cities,
            solution: &solution,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Reference solution".bold());
    println!("  Origin: {}", origin);
    let route: Vec<String> = cities
        .iter()
        .chain(std::iter::once(&origin))
        .map(ToString::to_string)
        .collect();
    println!("  Best tour: {}", route.join(" -> "));
    println!(
        "  Best length: {}",
        format!("{:.3}", solution.best_length).green()
    );
    println!("  Worst length: {:.3}", solution.worst_length);
    println!(
        "  Tours: {} ({} directed)",
        solution.tour_count, solution.directed_tour_count
    );

    Ok(())
}

fn solve(environment: &ColonyEnvironment, origin: CityId) -> Result<ReferenceSolution> {
    info!(
        cities = environment.graph.city_count(),
        origin = %origin,
        "Enumerating tours"
    );
    let solution = find_optimal_tour(&environment.graph, origin)
        .context("Reference solve failed")?;
    info!(
        best = solution.best_length,
        tours = solution.tour_count,
        "Enumeration finished"
    );
    Ok(solution)
}
