// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `antcolony run` - run a colony of workers on a graph file

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use antcolony_core::domain::colony_config::{ColonyConfig, OriginMode};
use antcolony_core::domain::events::ColonyEvent;
use antcolony_core::infrastructure::event_bus::{EventBus, EventBusError, EventReceiver};
use antcolony_core::infrastructure::graph_loader::GraphLoader;
use antcolony_core::infrastructure::results_writer::FileResultsWriter;
use antcolony_swarm::{Colony, ColonyOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OriginArg {
    /// Always start from the origin in the graph header
    Fixed,
    /// Draw a new origin every round
    Random,
}

impl From<OriginArg> for OriginMode {
    fn from(value: OriginArg) -> Self {
        match value {
            OriginArg::Fixed => OriginMode::Fixed,
            OriginArg::Random => OriginMode::RandomPerRound,
        }
    }
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Graph file: header line then one road per line
    #[arg(short, long, value_name = "FILE")]
    pub graph: PathBuf,

    /// Rounds each worker completes before terminating
    #[arg(short, long)]
    pub rounds: Option<u64>,

    /// Number of workers in the colony
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Distance exponent (overrides the graph header)
    #[arg(long)]
    pub beta: Option<f64>,

    /// Evaporation rate in [0, 1) (overrides the graph header)
    #[arg(long)]
    pub decay: Option<f64>,

    /// Pheromone deposit constant
    #[arg(long)]
    pub deposit: Option<f64>,

    /// Base random seed; worker i uses seed + i
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_enum)]
    pub origin_mode: Option<OriginArg>,

    /// Send status messages without round numbers
    #[arg(long)]
    pub no_round_tagging: bool,

    /// Directory for pheromone_levels.txt and best_tour.txt
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Do not print per-round progress
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Layer command line flags over the loaded configuration.
    pub fn apply_to(&self, config: &mut ColonyConfig) {
        if let Some(rounds) = self.rounds {
            config.rounds = rounds;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if self.beta.is_some() {
            config.beta = self.beta;
        }
        if self.decay.is_some() {
            config.decay = self.decay;
        }
        if let Some(deposit) = self.deposit {
            config.deposit = deposit;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(mode) = self.origin_mode {
            config.origin_mode = mode.into();
        }
        if self.no_round_tagging {
            config.round_tagging = false;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
    }
}

pub async fn handle_command(args: RunArgs, config_override: Option<PathBuf>) -> Result<()> {
    let mut config =
        ColonyConfig::load_or_default(config_override).context("Failed to load configuration")?;
    args.apply_to(&mut config);
    config.validate().context("Configuration validation failed")?;

    let environment = GraphLoader::parse_file(&args.graph)
        .with_context(|| format!("Failed to load graph {}", args.graph.display()))?;
    info!(
        graph = %args.graph.display(),
        cities = environment.graph.city_count(),
        edges = environment.graph.edge_count(),
        origin = %environment.origin,
        "Graph loaded"
    );

    let bus = EventBus::with_default_capacity();
    let events = bus.subscribe();
    let printer = (!args.quiet && !args.json).then(|| tokio::spawn(print_progress(events)));

    let colony = Colony::new()
        .with_writer(Arc::new(FileResultsWriter::new(config.output_dir.clone())))
        .with_event_bus(bus);
    let outcome = colony.run(Arc::new(environment), &config).await;

    // Last sender goes with the colony; the printer then sees the bus close
    drop(colony);
    if let Some(printer) = printer {
        if let Err(e) = printer.await {
            warn!(error = %e, "Progress printer failed");
        }
    }

    let outcome = outcome?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_summary(&outcome, &config);
    }
    Ok(())
}

async fn print_progress(mut events: EventReceiver) {
    loop {
        match events.recv().await {
            Ok(event) => print_event(&event),
            Err(EventBusError::Lagged(n)) => {
                println!("{}", format!("  ... {} events skipped", n).dimmed());
            }
            Err(_) => break,
        }
    }
}

fn print_event(event: &ColonyEvent) {
    match event {
        ColonyEvent::RoundCompleted {
            worker,
            round,
            tours,
            round_best,
            best_length,
            ..
        } => println!(
            "{} round {:>3}  tours {:>2}  round best {:>10.3}  best {:>10.3}",
            worker.as_str().cyan(),
            round,
            tours,
            round_best,
            best_length
        ),
        ColonyEvent::RoundAbandoned {
            worker,
            round,
            reason,
            ..
        } => println!(
            "{} round {:>3}  {}",
            worker.as_str().cyan(),
            round,
            format!("abandoned: {}", reason).yellow()
        ),
        ColonyEvent::WorkerTerminated {
            worker,
            rounds_completed,
            persisted,
            ..
        } => {
            let suffix = if *persisted { " (wrote results)" } else { "" };
            println!(
                "{} {}",
                worker.as_str().cyan(),
                format!("done after {} rounds{}", rounds_completed, suffix).green()
            );
        }
        _ => {}
    }
}

fn print_summary(outcome: &ColonyOutcome, config: &ColonyConfig) {
    println!();
    println!("{}", "Colony finished".bold());
    println!("  Workers: {}", outcome.reports.len());
    println!("  Elapsed: {} ms", outcome.elapsed().num_milliseconds());
    if outcome.rounds_abandoned() > 0 {
        println!(
            "  Abandoned rounds: {}",
            outcome.rounds_abandoned().to_string().yellow()
        );
    }

    match outcome.best_tour() {
        Some(tour) => println!("  Best length: {}", format!("{:.3}", tour.length()).green()),
        None => println!("  Best length: {}", "no tour found".red()),
    }

    if outcome.pheromone_converged() {
        println!("  Pheromone tables: {}", "identical".green());
    } else {
        println!("  Pheromone tables: {}", "diverged".yellow());
    }

    match outcome.persisted_by() {
        Some(worker) => println!(
            "  Results: {} (written by {})",
            config.output_dir.display(),
            worker
        ),
        None => println!("  Results: {}", "not written".red()),
    }
}
