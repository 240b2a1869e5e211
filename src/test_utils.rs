// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared test utilities.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use ndarray::Array2;

use crate::config::{Config, RunContext};
use crate::error::{NumericalError, Result};
use crate::grid::{ChunkExecutor, GridChunk, GridRequest};
use crate::hamiltonian::ScheduleLaw;

/// Default run context for a ring of `dimension` nodes with the given law.
pub fn test_context(dimension: usize, law: ScheduleLaw) -> RunContext {
    let mut config = Config::default();
    config.model.schedule = law;
    config
        .run_context(dimension)
        .expect("test context must be valid")
}

/// Assert element-wise |a − b| ≤ tol for two matrices of equal shape.
pub fn assert_matrix_close(a: &Array2<f64>, b: &Array2<f64>, tol: f64) {
    assert_eq!(a.dim(), b.dim(), "shape mismatch");
    for ((idx, x), y) in a.indexed_iter().zip(b.iter()) {
        assert!(
            (x - y).abs() <= tol,
            "mismatch at {:?}: {} vs {} (tol {})",
            idx,
            x,
            y,
            tol
        );
    }
}

/// Evenly spaced β values on [lo, hi].
pub fn beta_range(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    if count == 1 {
        return vec![lo];
    }
    (0..count)
        .map(|k| lo + (hi - lo) * k as f64 / (count - 1) as f64)
        .collect()
}

/// Executor that fills cell (β, t) with β + t and flags t > β.
///
/// Earlier chunks sleep longer, so chunks complete out of order.
#[derive(Debug, Default)]
pub struct EchoExecutor {
    pub stagger: Duration,
}

impl ChunkExecutor for EchoExecutor {
    fn execute(&self, request: GridRequest) -> Result<GridChunk> {
        std::thread::sleep(self.stagger * (8usize.saturating_sub(request.chunk_index)) as u32);
        let times = request.times();
        let rows = request.betas.len();
        let cols = times.len();
        let probability =
            Array2::from_shape_fn((rows, cols), |(i, j)| request.betas[i] + times[j]);
        let adiabatic_check = request.adiabatic_check.then(|| {
            Array2::from_shape_fn((rows, cols), |(i, j)| u8::from(times[j] > request.betas[i]))
        });
        Ok(GridChunk {
            chunk_index: request.chunk_index,
            times,
            betas: request.betas,
            probability,
            adiabatic_check,
        })
    }
}

/// Executor that blocks for `delay` before echoing.
#[derive(Debug)]
pub struct SlowExecutor {
    pub delay: Duration,
}

impl ChunkExecutor for SlowExecutor {
    fn execute(&self, request: GridRequest) -> Result<GridChunk> {
        std::thread::sleep(self.delay);
        EchoExecutor::default().execute(request)
    }
}

/// Executor that panics on one chunk.
#[derive(Debug)]
pub struct PanickingExecutor {
    pub chunk: usize,
}

impl ChunkExecutor for PanickingExecutor {
    fn execute(&self, request: GridRequest) -> Result<GridChunk> {
        if request.chunk_index == self.chunk {
            panic!("integrator exploded in chunk {}", self.chunk);
        }
        EchoExecutor::default().execute(request)
    }
}

/// Executor that returns a numerical error on one chunk.
#[derive(Debug)]
pub struct FailingExecutor {
    pub chunk: usize,
}

impl ChunkExecutor for FailingExecutor {
    fn execute(&self, request: GridRequest) -> Result<GridChunk> {
        if request.chunk_index == self.chunk {
            return Err(NumericalError::StepLimitExceeded {
                time: 1.0,
                steps: 10,
            }
            .into());
        }
        EchoExecutor::default().execute(request)
    }
}

/// Executor that spins on one chunk until cancelled (at most 5 s) and
/// optionally fails another one immediately.
#[derive(Debug)]
pub struct StallingExecutor {
    pub stall_chunk: usize,
    pub fail_chunk: Option<usize>,
}

impl ChunkExecutor for StallingExecutor {
    fn execute(&self, request: GridRequest) -> Result<GridChunk> {
        if request.chunk_index == self.stall_chunk {
            let started = Instant::now();
            while started.elapsed() < Duration::from_secs(5) {
                request.cancel.check()?;
                std::thread::sleep(Duration::from_millis(2));
            }
        }
        if Some(request.chunk_index) == self.fail_chunk {
            return Err(NumericalError::StepSizeTooSmall {
                time: 0.5,
                step: 1e-17,
            }
            .into());
        }
        EchoExecutor::default().execute(request)
    }
}

/// Executor that returns a chunk whose time axis disagrees with the request.
#[derive(Debug)]
pub struct SkewedTimesExecutor;

impl ChunkExecutor for SkewedTimesExecutor {
    fn execute(&self, request: GridRequest) -> Result<GridChunk> {
        let mut chunk = EchoExecutor::default().execute(request)?;
        if let Some(last) = chunk.times.last_mut() {
            *last += 1.0;
        }
        Ok(chunk)
    }
}

/// Executor recording the peak number of chunks running at once.
#[derive(Debug, Default)]
pub struct CountingExecutor {
    pub delay: Duration,
    pub active: AtomicUsize,
    pub peak: AtomicUsize,
    pub calls: AtomicUsize,
}

impl ChunkExecutor for CountingExecutor {
    fn execute(&self, request: GridRequest) -> Result<GridChunk> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.active.fetch_sub(1, Ordering::SeqCst);
        EchoExecutor::default().execute(request)
    }
}
