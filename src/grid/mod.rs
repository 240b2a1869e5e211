// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Parallel (β, T) grid evaluation.
//!
//! - [`partition`]: splits the β array into contiguous chunks
//! - [`evaluator`]: evaluates one chunk (probabilities, optional adiabatic flags)
//! - [`orchestrator`]: dispatches chunks concurrently and reassembles the grid
//!
//! # Example
//!
//! ```ignore
//! use ring_adiabatic::config::Config;
//! use ring_adiabatic::grid::GridOrchestrator;
//!
//! let config = Config::default();
//! let orchestrator = GridOrchestrator::new(config.run_context(5)?, config.grid.clone());
//! let output = orchestrator.run(&[0.5, 1.0, 1.5], 0.0, 100.0).await?;
//! assert_eq!(output.probability.dim(), (3, 40));
//! ```

pub mod evaluator;
pub mod orchestrator;
pub mod partition;

pub use evaluator::{evaluate_chunk, time_grid, ChunkExecutor, GridChunk, GridRequest, RingEvaluator};
pub use orchestrator::{run_dimension, GridOrchestrator, GridOutput};
pub use partition::{available_parallelism, PartitionStrategy};
