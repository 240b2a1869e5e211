// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Ring adiabatic search CLI
//!
//! # Usage
//!
//! ```bash
//! # Full (β, T) grid for N = 8, inputs read from the data directory
//! ring-adiabatic grid 8
//!
//! # One probability
//! ring-adiabatic probability 8 --beta 1.0 --time 50
//!
//! # Adiabatic time estimate and 0/1 flag
//! ring-adiabatic check 8 --beta 1.0 --time 50
//!
//! # Maximize the probability over a box
//! ring-adiabatic search 8 --beta-min 0.1 --beta-max 3 --time-min 1 --time-max 100
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ring_adiabatic::{
    cancel::CancelToken,
    config::Config,
    grid::{run_dimension, PartitionStrategy},
    probability::evaluate_with_retry,
    search::maximize_probability,
    spectral::AdiabaticEstimate,
    validation::{validate_beta, validate_total_time},
    Result, VERSION,
};

/// Adiabatic quantum search on a ring
#[derive(Parser)]
#[command(name = "ring-adiabatic")]
#[command(author = "Ring Search Contributors")]
#[command(version = VERSION)]
#[command(about = "Success probability and adiabatic time of quantum search on a ring")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Schedule law (linear, sqrt, cbrt)
    #[arg(long, global = true)]
    schedule: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate and persist the full (β, T) probability grid
    Grid {
        /// Ring dimension N
        dimension: usize,

        /// β values per chunk
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Upper bound on concurrently running chunks
        #[arg(long)]
        max_concurrency: Option<usize>,

        /// Also write the adiabatic-check matrix
        #[arg(long)]
        adiabatic_check: bool,

        /// Input directory
        #[arg(long, env = "RING_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Output directory
        #[arg(long, env = "RING_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Oracle probability for one (β, T)
    Probability {
        /// Ring dimension N
        dimension: usize,

        #[arg(long)]
        beta: f64,

        #[arg(long)]
        time: f64,
    },

    /// Adiabatic time estimate for β and the flag for T
    Check {
        /// Ring dimension N
        dimension: usize,

        #[arg(long)]
        beta: f64,

        #[arg(long)]
        time: f64,
    },

    /// Maximize the oracle probability over a (β, T) box
    Search {
        /// Ring dimension N
        dimension: usize,

        #[arg(long)]
        beta_min: f64,

        #[arg(long)]
        beta_max: f64,

        #[arg(long)]
        time_min: f64,

        #[arg(long)]
        time_max: f64,

        /// Stop once this probability is reached
        #[arg(long)]
        precision: Option<f64>,
    },

    /// Show effective configuration
    Config,

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(law) = &cli.schedule {
        config.model.schedule = law.parse()?;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    // Initialize logging
    init_logging(&config.logging.level, &config.logging.format);

    match cli.command {
        Commands::Grid {
            dimension,
            chunk_size,
            max_concurrency,
            adiabatic_check,
            data_dir,
            output_dir,
        } => {
            // Override config with CLI args
            if let Some(size) = chunk_size {
                config.grid.partition = PartitionStrategy::ChunkSize(size);
            }
            if max_concurrency.is_some() {
                config.grid.max_concurrency = max_concurrency;
            }
            if adiabatic_check {
                config.grid.adiabatic_check = true;
            }
            if let Some(dir) = data_dir {
                config.paths.data_dir = dir;
            }
            if let Some(dir) = output_dir {
                config.paths.output_dir = dir;
            }

            info!(
                version = VERSION,
                dimension,
                schedule = %config.model.schedule,
                partition = ?config.grid.partition,
                adiabatic_check = config.grid.adiabatic_check,
                "Starting grid run"
            );

            let output = run_dimension(&config, dimension).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "dimension": dimension,
                    "betas": output.betas.len(),
                    "times": output.times.len(),
                    "chunks": output.chunks,
                    "elapsed_sec": output.elapsed.as_secs_f64(),
                }))?
            );
        }

        Commands::Probability {
            dimension,
            beta,
            time,
        } => {
            validate_beta(beta)?;
            validate_total_time(time)?;
            let ctx = config.run_context(dimension)?;
            let probability = evaluate_with_retry(&ctx, beta, time, &CancelToken::new())?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "dimension": dimension,
                    "beta": beta,
                    "total_time": time,
                    "probability": probability,
                }))?
            );
        }

        Commands::Check {
            dimension,
            beta,
            time,
        } => {
            validate_beta(beta)?;
            validate_total_time(time)?;
            let ctx = config.run_context(dimension)?;
            let estimate = AdiabaticEstimate::compute(&ctx.model, &ctx.spectral, beta)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "dimension": dimension,
                    "total_time": time,
                    "estimate": estimate,
                    "adiabatic": estimate.flag(time),
                }))?
            );
        }

        Commands::Search {
            dimension,
            beta_min,
            beta_max,
            time_min,
            time_max,
            precision,
        } => {
            if let Some(p) = precision {
                config.search.precision = p;
            }
            config.validate()?;
            let ctx = config.run_context(dimension)?;
            let result = maximize_probability(
                &ctx,
                &config.search,
                (beta_min, beta_max),
                (time_min, time_max),
            )?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Config => {
            // Show effective configuration
            println!("{}", serde_yaml::to_string(&config)?);
        }

        Commands::Validate => {
            // Validate configuration
            match config.validate() {
                Ok(()) => {
                    println!("Configuration is valid");
                }
                Err(e) => {
                    eprintln!("Configuration error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

/// Initialize logging with tracing.
fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
