// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration management.
//!
//! Configuration is loaded from multiple sources with the following priority
//! (later sources override earlier ones):
//!
//! 1. Built-in defaults
//! 2. ring-adiabatic.yaml file
//! 3. Environment variables (RING_*)
//! 4. CLI arguments
//!
//! The resulting [`Config`] is frozen into a [`RunContext`] before any
//! evaluation starts; nothing in the hot path reads mutable globals.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::grid::PartitionStrategy;
use crate::hamiltonian::{RingModel, ScheduleLaw};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model settings
    #[serde(default)]
    pub model: ModelConfig,

    /// ODE integrator settings
    #[serde(default)]
    pub integrator: IntegratorConfig,

    /// Spectral analysis settings
    #[serde(default)]
    pub spectral: SpectralConfig,

    /// Grid evaluation settings
    #[serde(default)]
    pub grid: GridConfig,

    /// Probability search settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Artifact locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        // Load from file if specified
        if let Some(path) = config_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                config = serde_yaml::from_str(&content)?;
            }
        } else {
            // Try default locations
            for path in &["ring-adiabatic.yaml", "ring-adiabatic.yml"] {
                let path = Path::new(path);
                if path.exists() {
                    let content = std::fs::read_to_string(path)?;
                    config = serde_yaml::from_str(&content)?;
                    break;
                }
            }
        }

        // Override with environment variables
        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply `RING_*` overrides from an arbitrary key lookup.
    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("RING_SCHEDULE") {
            // Unknown laws abort: the law is process-wide
            self.model.schedule = val.parse()?;
        }
        if let Some(val) = lookup("RING_RTOL") {
            if let Ok(rtol) = val.parse() {
                self.integrator.rtol = rtol;
            }
        }
        if let Some(val) = lookup("RING_ATOL") {
            if let Ok(atol) = val.parse() {
                self.integrator.atol = atol;
            }
        }
        if let Some(val) = lookup("RING_CHUNK_SIZE") {
            if let Ok(size) = val.parse() {
                self.grid.partition = PartitionStrategy::ChunkSize(size);
            }
        }
        if let Some(val) = lookup("RING_CHUNK_COUNT") {
            if let Ok(count) = val.parse() {
                self.grid.partition = PartitionStrategy::ChunkCount(count);
            }
        }
        if let Some(val) = lookup("RING_TASK_TIMEOUT_SEC") {
            if let Ok(sec) = val.parse() {
                self.grid.task_timeout_sec = sec;
            }
        }
        if let Some(val) = lookup("RING_ADIABATIC_CHECK") {
            self.grid.adiabatic_check = val.to_lowercase() == "true" || val == "1";
        }
        if let Some(val) = lookup("RING_DATA_DIR") {
            self.paths.data_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("RING_OUTPUT_DIR") {
            self.paths.output_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("RING_LOG_LEVEL") {
            self.logging.level = val;
        }
        Ok(())
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        self.integrator.validate().map_err(Error::Config)?;
        if self.spectral.samples == 0 {
            return Err(Error::Config("spectral.samples must be > 0".into()));
        }
        if self.grid.time_samples == 0 {
            return Err(Error::Config("grid.time_samples must be > 0".into()));
        }
        match self.grid.partition {
            PartitionStrategy::ChunkSize(0) => {
                return Err(Error::Config("grid chunk size must be > 0".into()));
            }
            PartitionStrategy::ChunkCount(0) => {
                return Err(Error::Config("grid chunk count must be > 0".into()));
            }
            _ => {}
        }
        if self.grid.max_concurrency == Some(0) {
            return Err(Error::Config("grid.max_concurrency must be > 0".into()));
        }
        if self.grid.task_timeout_sec == 0 {
            return Err(Error::Config("grid.task_timeout_sec must be > 0".into()));
        }
        if self.search.samples == 0 {
            return Err(Error::Config("search.samples must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.search.precision) {
            return Err(Error::Config("search.precision must be in [0, 1]".into()));
        }
        Ok(())
    }

    /// Freeze the configuration into the read-only context of one run.
    pub fn run_context(&self, dimension: usize) -> Result<RunContext> {
        self.validate()?;
        Ok(RunContext {
            model: RingModel::new(dimension, self.model.schedule)?,
            integrator: self.integrator.clone(),
            spectral: self.spectral.clone(),
        })
    }
}

/// Everything an evaluation needs, fixed before any task starts.
///
/// Cheap to clone; each grid task receives its own copy.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    /// Ring size and schedule law
    pub model: RingModel,
    /// ODE integrator settings
    pub integrator: IntegratorConfig,
    /// Spectral analysis settings
    pub spectral: SpectralConfig,
}

/// Model configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Schedule law (linear, sqrt, cbrt)
    #[serde(default)]
    pub schedule: ScheduleLaw,
}

/// Adaptive Runge–Kutta integrator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegratorConfig {
    /// Relative error tolerance
    #[serde(default = "default_tolerance")]
    pub rtol: f64,

    /// Absolute error tolerance
    #[serde(default = "default_tolerance")]
    pub atol: f64,

    /// Maximum accepted + rejected steps per evolution
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Retries with tightened tolerances after a numerical fault
    #[serde(default)]
    pub max_retries: u32,

    /// Factor dividing rtol/atol on each retry
    #[serde(default = "default_retry_tightening")]
    pub retry_tightening: f64,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            rtol: default_tolerance(),
            atol: default_tolerance(),
            max_steps: default_max_steps(),
            max_retries: 0,
            retry_tightening: default_retry_tightening(),
        }
    }
}

impl IntegratorConfig {
    /// Copy with both tolerances divided by `retry_tightening^attempt`.
    pub fn tightened(&self, attempt: u32) -> Self {
        let factor = self.retry_tightening.powi(attempt as i32);
        Self {
            rtol: self.rtol / factor,
            atol: self.atol / factor,
            ..self.clone()
        }
    }

    /// Validate integrator parameters.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.rtol.is_finite() && self.rtol > 0.0) {
            return Err("integrator.rtol must be a positive finite number".into());
        }
        if !(self.atol.is_finite() && self.atol > 0.0) {
            return Err("integrator.atol must be a positive finite number".into());
        }
        if self.max_steps == 0 {
            return Err("integrator.max_steps must be > 0".into());
        }
        if self.retry_tightening.is_nan() || self.retry_tightening <= 1.0 {
            return Err("integrator.retry_tightening must be > 1".into());
        }
        Ok(())
    }
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_max_steps() -> usize {
    1_000_000
}

fn default_retry_tightening() -> f64 {
    10.0
}

/// Spectral analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralConfig {
    /// Low-discrepancy samples over s ∈ [0, 1]
    #[serde(default = "default_spectral_samples")]
    pub samples: usize,

    /// Nelder–Mead iterations per local refinement
    #[serde(default = "default_local_max_iters")]
    pub local_max_iters: u64,

    /// Simplex standard-deviation tolerance
    #[serde(default = "default_sd_tolerance")]
    pub sd_tolerance: f64,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            samples: default_spectral_samples(),
            local_max_iters: default_local_max_iters(),
            sd_tolerance: default_sd_tolerance(),
        }
    }
}

fn default_spectral_samples() -> usize {
    25
}

fn default_local_max_iters() -> u64 {
    200
}

fn default_sd_tolerance() -> f64 {
    1e-10
}

/// Grid evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Linearly spaced time points per β row
    #[serde(default = "default_time_samples")]
    pub time_samples: usize,

    /// How the β array is split into chunks
    #[serde(default)]
    pub partition: PartitionStrategy,

    /// Upper bound on concurrently running chunks (default: available parallelism)
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// Per-chunk timeout in seconds
    #[serde(default = "default_task_timeout")]
    pub task_timeout_sec: u64,

    /// Populate the adiabatic-check matrix alongside probabilities
    #[serde(default)]
    pub adiabatic_check: bool,

    /// Evaluate cells of a chunk in parallel
    #[serde(default = "default_true")]
    pub parallel_cells: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            time_samples: default_time_samples(),
            partition: PartitionStrategy::default(),
            max_concurrency: None,
            task_timeout_sec: default_task_timeout(),
            adiabatic_check: false,
            parallel_cells: true,
        }
    }
}

fn default_time_samples() -> usize {
    40
}

fn default_task_timeout() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

/// Probability search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Low-discrepancy samples over the (β, T) box
    #[serde(default = "default_search_samples")]
    pub samples: usize,

    /// Stop as soon as this probability is reached
    #[serde(default = "default_precision")]
    pub precision: f64,

    /// Nelder–Mead iterations per local refinement
    #[serde(default = "default_local_max_iters")]
    pub local_max_iters: u64,

    /// Simplex standard-deviation tolerance
    #[serde(default = "default_search_sd_tolerance")]
    pub sd_tolerance: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            samples: default_search_samples(),
            precision: default_precision(),
            local_max_iters: default_local_max_iters(),
            sd_tolerance: default_search_sd_tolerance(),
        }
    }
}

fn default_search_samples() -> usize {
    64
}

fn default_precision() -> f64 {
    0.99
}

fn default_search_sd_tolerance() -> f64 {
    1e-8
}

/// Input/output artifact directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding `{N}_beta_array.json` and `{N}_time_array.json`
    #[serde(default = "default_dir")]
    pub data_dir: PathBuf,

    /// Directory receiving `{N}_probability_pow2.json`
    #[serde(default = "default_dir")]
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_dir(),
            output_dir: default_dir(),
        }
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}
