// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Colony Configuration
//
// Run parameters for a colony of tour-finding workers:
// - round budget and worker count
// - search parameters (beta, decay, deposit constant, initial pheromone)
// - origin selection mode and round tagging of status messages
// - output location for the persisted results
//
// Loaded from YAML, overridable from the environment and the CLI.

use crate::domain::graph::ColonyEnvironment;
use crate::domain::status::TOUR_FINDING_SERVICE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Evaporation rate used when neither the config nor the graph header sets one.
pub const DEFAULT_DECAY: f64 = 0.1;

const CONFIG_PATH_ENV: &str = "ANTCOLONY_CONFIG_PATH";

/// How each worker picks the origin city of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginMode {
    /// Every round starts from the origin named in the graph header.
    #[default]
    Fixed,
    /// Every worker draws a fresh origin at the start of each round.
    RandomPerRound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColonyConfig {
    /// Completed rounds after which a worker terminates
    pub rounds: u64,

    /// Number of workers spawned by the in-process swarm
    pub workers: usize,

    /// Distance exponent; overrides the graph header when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,

    /// Evaporation rate in [0, 1); overrides the graph header when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decay: Option<f64>,

    /// Pheromone deposit constant Q
    pub deposit: f64,

    pub initial_pheromone: f64,

    pub origin_mode: OriginMode,

    /// Attach the round number to status messages
    pub round_tagging: bool,

    /// Base seed; worker i uses seed + i
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    pub service_tag: String,

    /// Directory receiving pheromone_levels.txt and best_tour.txt
    pub output_dir: PathBuf,
}

impl Default for ColonyConfig {
    fn default() -> Self {
        Self {
            rounds: 10,
            workers: 3,
            beta: None,
            decay: None,
            deposit: 1.0,
            initial_pheromone: 0.0,
            origin_mode: OriginMode::Fixed,
            round_tagging: true,
            seed: None,
            service_tag: TOUR_FINDING_SERVICE.to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

/// Parameters a worker actually searches with, after merging the config
/// with the graph header.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParameters {
    pub rounds: u64,
    pub beta: f64,
    pub decay: f64,
    pub deposit: f64,
    pub initial_pheromone: f64,
    pub origin_mode: OriginMode,
    pub round_tagging: bool,
    pub service_tag: String,
}

impl ColonyConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. ANTCOLONY_CONFIG_PATH environment variable
    /// 2. ./antcolony.yaml (working directory)
    /// 3. ~/.antcolony/config.yaml (user home)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./antcolony.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".antcolony").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }

    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::debug!("No configuration file found, using defaults");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Some(rounds) = env_parse::<u64>("ANTCOLONY_ROUNDS") {
            self.rounds = rounds;
        }
        if let Some(workers) = env_parse::<usize>("ANTCOLONY_WORKERS") {
            self.workers = workers;
        }
        if let Some(seed) = env_parse::<u64>("ANTCOLONY_SEED") {
            self.seed = Some(seed);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rounds == 0 {
            anyhow::bail!("rounds must be at least 1");
        }
        if self.workers == 0 {
            anyhow::bail!("workers must be at least 1");
        }
        if let Some(beta) = self.beta {
            check_beta(beta)?;
        }
        if let Some(decay) = self.decay {
            check_decay(decay)?;
        }
        if !self.deposit.is_finite() || self.deposit < 0.0 {
            anyhow::bail!("deposit must be finite and non-negative, got {}", self.deposit);
        }
        if !self.initial_pheromone.is_finite() || self.initial_pheromone < 0.0 {
            anyhow::bail!(
                "initial_pheromone must be finite and non-negative, got {}",
                self.initial_pheromone
            );
        }
        if self.service_tag.trim().is_empty() {
            anyhow::bail!("service_tag cannot be empty");
        }
        Ok(())
    }

    /// Merge with the graph header: config values win, then the header,
    /// then [`DEFAULT_DECAY`] for the evaporation rate.
    pub fn parameters_for(&self, environment: &ColonyEnvironment) -> anyhow::Result<SearchParameters> {
        self.validate()?;

        let beta = self.beta.unwrap_or(environment.beta);
        check_beta(beta)?;
        let decay = self.decay.or(environment.decay).unwrap_or(DEFAULT_DECAY);
        check_decay(decay)?;

        Ok(SearchParameters {
            rounds: self.rounds,
            beta,
            decay,
            deposit: self.deposit,
            initial_pheromone: self.initial_pheromone,
            origin_mode: self.origin_mode,
            round_tagging: self.round_tagging,
            service_tag: self.service_tag.clone(),
        })
    }
}

fn check_beta(beta: f64) -> anyhow::Result<()> {
    if !beta.is_finite() || beta < 0.0 {
        anyhow::bail!("beta must be finite and non-negative, got {}", beta);
    }
    Ok(())
}

fn check_decay(decay: f64) -> anyhow::Result<()> {
    if !(0.0..1.0).contains(&decay) {
        anyhow::bail!("decay must be in [0, 1), got {}", decay);
    }
    Ok(())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}
