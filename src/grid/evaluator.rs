// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Worker unit of the (β, T) grid.
//!
//! A chunk owns a contiguous slice of the β axis and evaluates every
//! (β, t) cell against a linear time grid it builds from its own bounds.
//! Inputs and outputs are owned values so a chunk can run on any thread
//! without borrowing from the caller.

use std::time::Instant;

use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::config::RunContext;
use crate::error::{Result, ValidationError};
use crate::probability::evaluate_with_retry;
use crate::spectral::AdiabaticEstimate;

/// Inclusive linear grid of `samples` points on [lb, ub].
pub fn time_grid(time_lb: f64, time_ub: f64, samples: usize) -> Vec<f64> {
    match samples {
        0 => Vec::new(),
        1 => vec![time_lb],
        n => {
            let step = (time_ub - time_lb) / (n - 1) as f64;
            (0..n)
                .map(|k| if k == n - 1 { time_ub } else { time_lb + step * k as f64 })
                .collect()
        }
    }
}

/// Everything one chunk needs, owned.
#[derive(Debug, Clone)]
pub struct GridRequest {
    /// Position of this chunk in the partition
    pub chunk_index: usize,
    /// β values of this chunk, in order
    pub betas: Vec<f64>,
    /// First point of the time axis
    pub time_lb: f64,
    /// Last point of the time axis
    pub time_ub: f64,
    /// Points on the time axis
    pub time_samples: usize,
    /// Frozen model and numerical settings
    pub context: RunContext,
    /// Also compute the 0/1 adiabatic flags
    pub adiabatic_check: bool,
    /// Evaluate cells on the rayon pool
    pub parallel_cells: bool,
    /// Polled between cells and integrator steps
    pub cancel: CancelToken,
}

impl GridRequest {
    /// The time axis this request evaluates.
    pub fn times(&self) -> Vec<f64> {
        time_grid(self.time_lb, self.time_ub, self.time_samples)
    }
}

/// Partial result of one chunk: rows are β, columns are t.
#[derive(Debug, Clone, PartialEq)]
pub struct GridChunk {
    pub chunk_index: usize,
    pub times: Vec<f64>,
    pub betas: Vec<f64>,
    pub probability: Array2<f64>,
    pub adiabatic_check: Option<Array2<u8>>,
}

/// Executes grid chunks. Implementations must be callable from any thread.
pub trait ChunkExecutor: Send + Sync + 'static {
    /// Evaluate one chunk.
    ///
    /// Long-running implementations should poll `request.cancel` and
    /// return `Error::Cancelled` once it fires.
    fn execute(&self, request: GridRequest) -> Result<GridChunk>;
}

/// Executor backed by the Schrödinger evolver and the spectral analyzer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RingEvaluator;

impl ChunkExecutor for RingEvaluator {
    fn execute(&self, request: GridRequest) -> Result<GridChunk> {
        evaluate_chunk(request)
    }
}

/// Probability (and optionally adiabatic-flag) matrix for one chunk.
pub fn evaluate_chunk(request: GridRequest) -> Result<GridChunk> {
    request.cancel.check()?;
    let started = Instant::now();
    let times = request.times();
    let rows = request.betas.len();
    let cols = times.len();
    let ctx = &request.context;
    let cancel = &request.cancel;

    let cells: Vec<(f64, f64)> = request
        .betas
        .iter()
        .flat_map(|&beta| times.iter().map(move |&t| (beta, t)))
        .collect();

    let cell = |&(beta, t): &(f64, f64)| -> Result<f64> {
        cancel.check()?;
        evaluate_with_retry(ctx, beta, t, cancel)
    };
    let values: Vec<f64> = if request.parallel_cells {
        cells.par_iter().map(cell).collect::<Result<_>>()?
    } else {
        cells.iter().map(cell).collect::<Result<_>>()?
    };
    let probability = into_matrix(values, rows, cols)?;

    let adiabatic_check = if request.adiabatic_check {
        let estimate = |&beta: &f64| -> Result<AdiabaticEstimate> {
            cancel.check()?;
            AdiabaticEstimate::compute(&ctx.model, &ctx.spectral, beta)
        };
        let estimates: Vec<AdiabaticEstimate> = if request.parallel_cells {
            request.betas.par_iter().map(estimate).collect::<Result<_>>()?
        } else {
            request.betas.iter().map(estimate).collect::<Result<_>>()?
        };
        let flags: Vec<u8> = estimates
            .iter()
            .flat_map(|est| times.iter().map(move |&t| est.flag(t)))
            .collect();
        Some(into_matrix(flags, rows, cols)?)
    } else {
        None
    };

    debug!(
        chunk = request.chunk_index,
        betas = rows,
        times = cols,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "chunk evaluated"
    );

    Ok(GridChunk {
        chunk_index: request.chunk_index,
        times,
        betas: request.betas,
        probability,
        adiabatic_check,
    })
}

fn into_matrix<T>(values: Vec<T>, rows: usize, cols: usize) -> Result<Array2<T>> {
    let actual = values.len();
    Array2::from_shape_vec((rows, cols), values).map_err(|_| {
        ValidationError::Shape {
            artifact: "grid chunk".into(),
            expected: format!("{}x{}", rows, cols),
            actual: format!("{} values", actual),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::hamiltonian::ScheduleLaw;
    use crate::probability::evaluate_probability;
    use crate::test_utils::test_context;
    use approx::assert_relative_eq;

    fn request(betas: Vec<f64>, time_ub: f64, samples: usize, parallel: bool) -> GridRequest {
        GridRequest {
            chunk_index: 0,
            betas,
            time_lb: 0.0,
            time_ub,
            time_samples: samples,
            context: test_context(4, ScheduleLaw::Cbrt),
            adiabatic_check: false,
            parallel_cells: parallel,
            cancel: CancelToken::new(),
        }
    }

    #[test]
    fn test_time_grid_reference_length() {
        let times = time_grid(0.0, 100.0, 40);
        assert_eq!(times.len(), 40);
        assert_eq!(times[0], 0.0);
        assert_eq!(times[39], 100.0);
        assert_relative_eq!(times[1], 100.0 / 39.0, epsilon = 1e-12);
    }

    #[test]
    fn test_time_grid_degenerate() {
        assert!(time_grid(0.0, 1.0, 0).is_empty());
        assert_eq!(time_grid(2.0, 5.0, 1), vec![2.0]);
        assert_eq!(time_grid(3.0, 3.0, 4), vec![3.0; 4]);
    }

    #[test]
    fn test_chunk_builds_and_returns_its_time_axis() {
        let mut req = request(vec![0.5], 10.0, 40, false);
        req.time_lb = 2.0;
        let chunk = evaluate_chunk(req).unwrap();
        assert_eq!(chunk.times, time_grid(2.0, 10.0, 40));
        assert_eq!(chunk.probability.dim(), (1, 40));
    }

    #[test]
    fn test_chunk_shape_and_order() {
        let betas = vec![0.2, 0.9, 1.5];
        let chunk = evaluate_chunk(request(betas.clone(), 6.0, 4, true)).unwrap();
        assert_eq!(chunk.probability.dim(), (3, 4));
        assert_eq!(chunk.betas, betas);
        assert!(chunk.adiabatic_check.is_none());

        let ctx = test_context(4, ScheduleLaw::Cbrt);
        for (i, &beta) in betas.iter().enumerate() {
            for (j, &t) in chunk.times.iter().enumerate() {
                let p = evaluate_probability(&ctx, beta, t).unwrap();
                assert_eq!(chunk.probability[[i, j]], p);
            }
        }
    }

    #[test]
    fn test_first_column_is_uniform() {
        let chunk = evaluate_chunk(request(vec![0.5, 2.0], 3.0, 3, false)).unwrap();
        for i in 0..2 {
            assert_relative_eq!(chunk.probability[[i, 0]], 0.25, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let a = evaluate_chunk(request(vec![0.3, 1.1], 5.0, 5, true)).unwrap();
        let b = evaluate_chunk(request(vec![0.3, 1.1], 5.0, 5, false)).unwrap();
        assert_eq!(a.probability, b.probability);
    }

    #[test]
    fn test_adiabatic_matrix_rows_are_monotone_in_time() {
        for parallel in [true, false] {
            let mut req = request(vec![1.0], 50.0, 6, parallel);
            req.context = test_context(5, ScheduleLaw::Linear);
            req.adiabatic_check = true;
            let chunk = evaluate_chunk(req).unwrap();
            let flags = chunk.adiabatic_check.unwrap();
            assert_eq!(flags.dim(), (1, 6));
            // T_ad ≈ 3.78 for N = 5, β = 1
            assert_eq!(flags.row(0).to_vec(), vec![0, 1, 1, 1, 1, 1]);
        }
    }

    #[test]
    fn test_numerical_fault_fails_chunk() {
        let mut req = request(vec![1.0], 50.0, 2, true);
        req.context.integrator.max_steps = 2;
        assert!(evaluate_chunk(req).is_err());
    }

    #[test]
    fn test_cancelled_request_stops_before_work() {
        for parallel in [true, false] {
            let req = request(vec![0.5, 1.0], 50.0, 10, parallel);
            req.cancel.cancel();
            assert!(matches!(evaluate_chunk(req), Err(Error::Cancelled)));
        }
    }
}
