// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Concurrent dispatch of grid chunks.
//!
//! The β array is partitioned into contiguous chunks. Each chunk runs on
//! the blocking pool under a semaphore permit and a timeout. All chunks of
//! a run share one cancel token, fired by the first failure or timeout.
//! The partial matrices are stitched back together in partition order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ndarray::{concatenate, Array2, ArrayView2, Axis};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use super::evaluator::{time_grid, ChunkExecutor, GridChunk, GridRequest, RingEvaluator};
use super::partition::available_parallelism;
use crate::cancel::CancelToken;
use crate::config::{Config, GridConfig, RunContext};
use crate::error::{Error, Result, TaskError, ValidationError};
use crate::io::{ArtifactStore, GridSummary};
use crate::validation::{validate_beta_array, validate_time_range};

/// Assembled result of a full grid run.
#[derive(Debug, Clone)]
pub struct GridOutput {
    /// Time axis (columns)
    pub times: Vec<f64>,
    /// β axis (rows)
    pub betas: Vec<f64>,
    /// Success probability, shape `[betas.len(), times.len()]`
    pub probability: Array2<f64>,
    /// 0/1 adiabatic flags, same shape, when enabled
    pub adiabatic_check: Option<Array2<u8>>,
    /// Number of chunks dispatched
    pub chunks: usize,
    /// Wall-clock time of the run
    pub elapsed: Duration,
}

impl GridOutput {
    /// Persistable description of this run.
    pub fn summary(&self, context: &RunContext) -> GridSummary {
        GridSummary {
            dimension: context.model.dimension(),
            schedule: context.model.schedule(),
            times: self.times.clone(),
            betas: self.betas.clone(),
            rtol: context.integrator.rtol,
            atol: context.integrator.atol,
            chunks: self.chunks,
            adiabatic_check: self.adiabatic_check.is_some(),
            elapsed_sec: self.elapsed.as_secs_f64(),
        }
    }
}

/// Fans grid chunks out to an executor and gathers them back in order.
pub struct GridOrchestrator<E: ChunkExecutor = RingEvaluator> {
    context: RunContext,
    grid: GridConfig,
    executor: Arc<E>,
    task_timeout: Duration,
}

impl GridOrchestrator<RingEvaluator> {
    /// Orchestrator evaluating chunks with the Schrödinger evolver.
    pub fn new(context: RunContext, grid: GridConfig) -> Self {
        Self::with_executor(context, grid, RingEvaluator)
    }
}

impl<E: ChunkExecutor> GridOrchestrator<E> {
    /// Orchestrator with a custom chunk executor.
    pub fn with_executor(context: RunContext, grid: GridConfig, executor: E) -> Self {
        let task_timeout = Duration::from_secs(grid.task_timeout_sec);
        Self {
            context,
            grid,
            executor: Arc::new(executor),
            task_timeout,
        }
    }

    /// Override the per-chunk timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Upper bound on chunks running at the same time.
    pub fn concurrency(&self) -> usize {
        self.grid
            .max_concurrency
            .unwrap_or_else(available_parallelism)
            .max(1)
    }

    /// Evaluate the full (β, t) grid.
    ///
    /// The time axis holds `time_samples` linearly spaced points on
    /// [time_lb, time_ub]. The first chunk to fail cancels every other
    /// chunk. The reported error is the lowest-indexed failure observed,
    /// with real failures ahead of cancellations.
    pub async fn run(&self, betas: &[f64], time_lb: f64, time_ub: f64) -> Result<GridOutput> {
        validate_beta_array(betas)?;
        validate_time_range(time_lb, time_ub)?;

        let started = Instant::now();
        let times = time_grid(time_lb, time_ub, self.grid.time_samples);
        let ranges = self.grid.partition.ranges(betas.len());
        let semaphore = Arc::new(Semaphore::new(self.concurrency()));
        let cancel = CancelToken::new();
        // Dropping this future stops chunks still on the blocking pool
        let _guard = cancel.drop_guard();

        info!(
            dimension = self.context.model.dimension(),
            betas = betas.len(),
            times = times.len(),
            chunks = ranges.len(),
            concurrency = self.concurrency(),
            "starting grid evaluation"
        );

        let mut pending = JoinSet::new();
        for (chunk_index, range) in ranges.iter().enumerate() {
            let request = GridRequest {
                chunk_index,
                betas: betas[range.clone()].to_vec(),
                time_lb,
                time_ub,
                time_samples: self.grid.time_samples,
                context: self.context.clone(),
                adiabatic_check: self.grid.adiabatic_check,
                parallel_cells: self.grid.parallel_cells,
                cancel: cancel.clone(),
            };
            let executor = Arc::clone(&self.executor);
            let semaphore = Arc::clone(&semaphore);
            let timeout = self.task_timeout;
            pending.spawn(async move {
                let outcome = run_chunk(executor, semaphore, request, timeout).await;
                (chunk_index, outcome)
            });
        }

        let mut slots: Vec<Option<GridChunk>> = vec![None; ranges.len()];
        let mut failures: Vec<TaskError> = Vec::new();
        while let Some(joined) = pending.join_next().await {
            match joined {
                Ok((idx, Ok(chunk))) => slots[idx] = Some(chunk),
                Ok((idx, Err(e))) => {
                    if failures.is_empty() {
                        error!(chunk = idx, error = %e, "grid chunk failed, cancelling run");
                        cancel.cancel();
                        pending.abort_all();
                    }
                    failures.push(e);
                }
                Err(join_error) if join_error.is_panic() => {
                    std::panic::resume_unwind(join_error.into_panic())
                }
                // Aborted after the first failure
                Err(_) => {}
            }
        }
        if let Some(failure) = first_failure(failures) {
            return Err(failure.into());
        }

        let chunks = slots
            .into_iter()
            .collect::<Option<Vec<GridChunk>>>()
            .ok_or_else(|| ValidationError::Shape {
                artifact: "grid".into(),
                expected: format!("{} chunks", ranges.len()),
                actual: "a missing chunk".into(),
            })?;
        for (chunk, range) in chunks.iter().zip(&ranges) {
            check_chunk(chunk, range.len(), &times)?;
        }
        let probability = stack(chunks.iter().map(|c| c.probability.view()).collect())?;
        let adiabatic_check = if self.grid.adiabatic_check {
            let views = chunks
                .iter()
                .map(|c| c.adiabatic_check.as_ref().map(|m| m.view()))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| ValidationError::Shape {
                    artifact: "adiabatic check".into(),
                    expected: "a matrix from every chunk".into(),
                    actual: "missing".into(),
                })?;
            Some(stack(views)?)
        } else {
            None
        };

        let elapsed = started.elapsed();
        info!(
            chunks = chunks.len(),
            elapsed_sec = elapsed.as_secs_f64(),
            "grid evaluation complete"
        );

        Ok(GridOutput {
            times,
            betas: betas.to_vec(),
            probability,
            adiabatic_check,
            chunks: chunks.len(),
            elapsed,
        })
    }
}

/// Run one chunk on the blocking pool once a permit is available.
///
/// A timeout fires the chunk's cancel token so the blocking work returns.
async fn run_chunk<E: ChunkExecutor>(
    executor: Arc<E>,
    semaphore: Arc<Semaphore>,
    request: GridRequest,
    timeout: Duration,
) -> std::result::Result<GridChunk, TaskError> {
    let chunk = request.chunk_index;
    let cancel = request.cancel.clone();
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|_| TaskError::Cancelled { chunk })?;
    if cancel.is_cancelled() {
        return Err(TaskError::Cancelled { chunk });
    }

    let started = Instant::now();
    let result = tokio::time::timeout(
        timeout,
        tokio::task::spawn_blocking(move || executor.execute(request)),
    )
    .await;

    match result {
        Ok(Ok(Ok(output))) => {
            debug!(
                chunk,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "chunk finished"
            );
            Ok(output)
        }
        Ok(Ok(Err(Error::Cancelled))) => Err(TaskError::Cancelled { chunk }),
        Ok(Ok(Err(e))) => Err(TaskError::Failed {
            chunk,
            source: Box::new(e),
        }),
        Ok(Err(join_error)) => Err(task_join_error(chunk, join_error)),
        Err(_elapsed) => {
            cancel.cancel();
            warn!(chunk, timeout_ms = timeout.as_millis() as u64, "chunk timed out");
            Err(TaskError::TimedOut { chunk, timeout })
        }
    }
}

/// Lowest-indexed failure, real failures ahead of cancellations.
fn first_failure(failures: Vec<TaskError>) -> Option<TaskError> {
    failures
        .into_iter()
        .min_by_key(|f| (matches!(f, TaskError::Cancelled { .. }), f.chunk()))
}

fn task_join_error(chunk: usize, join_error: JoinError) -> TaskError {
    if join_error.is_panic() {
        let payload = join_error.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".into());
        TaskError::Panicked { chunk, message }
    } else {
        TaskError::Cancelled { chunk }
    }
}

fn check_chunk(chunk: &GridChunk, rows: usize, times: &[f64]) -> Result<()> {
    let actual = chunk.probability.dim();
    if actual != (rows, times.len()) {
        return Err(ValidationError::Shape {
            artifact: format!("chunk {}", chunk.chunk_index),
            expected: format!("{}x{}", rows, times.len()),
            actual: format!("{}x{}", actual.0, actual.1),
        }
        .into());
    }
    if chunk.times != times {
        return Err(ValidationError::Shape {
            artifact: format!("chunk {} time axis", chunk.chunk_index),
            expected: format!("{:?}", times),
            actual: format!("{:?}", chunk.times),
        }
        .into());
    }
    Ok(())
}

fn stack<T: Clone>(views: Vec<ArrayView2<'_, T>>) -> Result<Array2<T>> {
    concatenate(Axis(0), &views).map_err(|e| {
        ValidationError::Shape {
            artifact: "grid".into(),
            expected: "chunks with equal column counts".into(),
            actual: e.to_string(),
        }
        .into()
    })
}

/// Load the inputs for dimension N, run the grid and persist every artifact.
pub async fn run_dimension(config: &Config, dimension: usize) -> Result<GridOutput> {
    let store = ArtifactStore::from_config(&config.paths);
    let betas = store.load_betas(dimension)?;
    let (time_lb, time_ub) = store.load_time_bounds(dimension)?;
    let context = config.run_context(dimension)?;

    let orchestrator = GridOrchestrator::new(context, config.grid.clone());
    let output = orchestrator.run(&betas, time_lb, time_ub).await?;

    store.save_probability(dimension, &output.probability)?;
    if let Some(flags) = &output.adiabatic_check {
        store.save_adiabatic(dimension, flags)?;
    }
    store.save_summary(&output.summary(orchestrator.context()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, NumericalError};
    use crate::grid::PartitionStrategy;
    use crate::hamiltonian::ScheduleLaw;
    use crate::test_utils::{
        beta_range, test_context, CountingExecutor, EchoExecutor, FailingExecutor,
        PanickingExecutor, SkewedTimesExecutor, SlowExecutor, StallingExecutor,
    };
    use std::sync::atomic::Ordering;

    fn grid(partition: PartitionStrategy, time_samples: usize) -> GridConfig {
        GridConfig {
            time_samples,
            partition,
            max_concurrency: Some(4),
            ..GridConfig::default()
        }
    }

    fn echo(partition: PartitionStrategy) -> GridOrchestrator<EchoExecutor> {
        GridOrchestrator::with_executor(
            test_context(3, ScheduleLaw::Cbrt),
            grid(partition, 6),
            EchoExecutor {
                stagger: Duration::from_millis(3),
            },
        )
    }

    #[tokio::test]
    async fn test_rows_follow_beta_order() {
        let betas = beta_range(0.0, 2.2, 12);
        let output = echo(PartitionStrategy::ChunkSize(5))
            .run(&betas, 0.0, 5.0)
            .await
            .unwrap();
        assert_eq!(output.chunks, 3);
        assert_eq!(output.probability.dim(), (12, 6));
        assert_eq!(output.betas, betas);
        for (i, beta) in betas.iter().enumerate() {
            for (j, t) in output.times.iter().enumerate() {
                assert_eq!(output.probability[[i, j]], beta + t);
            }
        }
        assert!(output.adiabatic_check.is_none());
    }

    #[tokio::test]
    async fn test_adiabatic_matrices_are_stacked() {
        let mut orchestrator = echo(PartitionStrategy::ChunkCount(3));
        orchestrator.grid.adiabatic_check = true;
        let betas = vec![0.5, 1.5, 2.5, 3.5];
        let output = orchestrator.run(&betas, 0.0, 5.0).await.unwrap();
        let flags = output.adiabatic_check.unwrap();
        assert_eq!(flags.dim(), (4, 6));
        assert_eq!(flags.row(0).to_vec(), vec![0, 1, 1, 1, 1, 1]);
        assert_eq!(flags.row(3).to_vec(), vec![0, 0, 0, 0, 1, 1]);
    }

    #[tokio::test]
    async fn test_single_beta_single_chunk() {
        let output = echo(PartitionStrategy::ChunkSize(5))
            .run(&[0.7], 1.0, 1.0)
            .await
            .unwrap();
        assert_eq!(output.chunks, 1);
        assert_eq!(output.probability.dim(), (1, 6));
    }

    #[tokio::test]
    async fn test_invalid_inputs_rejected_before_dispatch() {
        let orchestrator = echo(PartitionStrategy::default());
        let err = orchestrator.run(&[], 0.0, 1.0).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = orchestrator.run(&[1.0], 5.0, 1.0).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = orchestrator.run(&[-1.0], 0.0, 1.0).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_failure_is_tagged_with_chunk() {
        let orchestrator = GridOrchestrator::with_executor(
            test_context(3, ScheduleLaw::Cbrt),
            grid(PartitionStrategy::ChunkSize(2), 4),
            FailingExecutor { chunk: 1 },
        );
        let err = orchestrator
            .run(&beta_range(0.0, 1.0, 6), 0.0, 1.0)
            .await
            .unwrap_err();
        match err {
            Error::Task(TaskError::Failed { chunk, source }) => {
                assert_eq!(chunk, 1);
                assert!(matches!(
                    *source,
                    Error::Numerical(NumericalError::StepLimitExceeded { .. })
                ));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_panic_is_reported() {
        let orchestrator = GridOrchestrator::with_executor(
            test_context(3, ScheduleLaw::Cbrt),
            grid(PartitionStrategy::ChunkSize(1), 4),
            PanickingExecutor { chunk: 2 },
        );
        let err = orchestrator
            .run(&[0.1, 0.2, 0.3, 0.4], 0.0, 1.0)
            .await
            .unwrap_err();
        match err {
            Error::Task(TaskError::Panicked { chunk, message }) => {
                assert_eq!(chunk, 2);
                assert!(message.contains("exploded"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let orchestrator = GridOrchestrator::with_executor(
            test_context(3, ScheduleLaw::Cbrt),
            grid(PartitionStrategy::ChunkSize(5), 4),
            SlowExecutor {
                delay: Duration::from_millis(400),
            },
        )
        .with_timeout(Duration::from_millis(20));
        let err = orchestrator.run(&[1.0, 2.0], 0.0, 1.0).await.unwrap_err();
        match err {
            Error::Task(TaskError::TimedOut { chunk, timeout }) => {
                assert_eq!(chunk, 0);
                assert_eq!(timeout, Duration::from_millis(20));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    fn two_worker_runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_timed_out_chunk_stops_its_work() {
        let started = Instant::now();
        let runtime = two_worker_runtime();
        let orchestrator = GridOrchestrator::with_executor(
            test_context(3, ScheduleLaw::Cbrt),
            grid(PartitionStrategy::ChunkSize(5), 4),
            StallingExecutor {
                stall_chunk: 0,
                fail_chunk: None,
            },
        )
        .with_timeout(Duration::from_millis(50));
        let err = runtime
            .block_on(orchestrator.run(&[1.0, 2.0], 0.0, 1.0))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Task(TaskError::TimedOut { chunk: 0, .. })
        ));
        // Shutdown waits for blocking threads, so this bounds the stalled chunk
        drop(runtime);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_timeout_stops_long_integration() {
        let started = Instant::now();
        let runtime = two_worker_runtime();
        let mut context = test_context(5, ScheduleLaw::Linear);
        context.integrator.max_steps = usize::MAX;
        let orchestrator =
            GridOrchestrator::new(context, grid(PartitionStrategy::ChunkSize(5), 1))
                .with_timeout(Duration::from_millis(50));
        let err = runtime
            .block_on(orchestrator.run(&[1.0], 1e7, 1e7))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Task(TaskError::TimedOut { chunk: 0, .. })
        ));
        drop(runtime);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failure_cancels_stalled_chunks() {
        let orchestrator = GridOrchestrator::with_executor(
            test_context(3, ScheduleLaw::Cbrt),
            grid(PartitionStrategy::ChunkSize(1), 4),
            StallingExecutor {
                stall_chunk: 0,
                fail_chunk: Some(3),
            },
        );
        let started = Instant::now();
        let err = orchestrator
            .run(&[0.1, 0.2, 0.3, 0.4], 0.0, 1.0)
            .await
            .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(2));
        match err {
            Error::Task(TaskError::Failed { chunk, source }) => {
                assert_eq!(chunk, 3);
                assert!(matches!(
                    *source,
                    Error::Numerical(NumericalError::StepSizeTooSmall { .. })
                ));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_first_failure_prefers_lowest_real_failure() {
        let failures = vec![
            TaskError::Cancelled { chunk: 0 },
            TaskError::TimedOut {
                chunk: 4,
                timeout: Duration::from_secs(1),
            },
            TaskError::Panicked {
                chunk: 2,
                message: "boom".into(),
            },
            TaskError::Cancelled { chunk: 1 },
        ];
        let first = first_failure(failures).unwrap();
        assert!(matches!(first, TaskError::Panicked { chunk: 2, .. }));

        let only_cancelled = vec![
            TaskError::Cancelled { chunk: 5 },
            TaskError::Cancelled { chunk: 3 },
        ];
        assert_eq!(first_failure(only_cancelled).unwrap().chunk(), 3);
        assert!(first_failure(Vec::new()).is_none());
    }

    #[tokio::test]
    async fn test_mismatched_time_axis_is_rejected() {
        let orchestrator = GridOrchestrator::with_executor(
            test_context(3, ScheduleLaw::Cbrt),
            grid(PartitionStrategy::ChunkSize(2), 4),
            SkewedTimesExecutor,
        );
        let err = orchestrator
            .run(&[0.5, 1.0, 1.5], 0.0, 3.0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::Shape { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let mut config = grid(PartitionStrategy::ChunkSize(1), 3);
        config.max_concurrency = Some(2);
        let orchestrator = GridOrchestrator::with_executor(
            test_context(3, ScheduleLaw::Cbrt),
            config,
            CountingExecutor {
                delay: Duration::from_millis(30),
                ..Default::default()
            },
        );
        assert_eq!(orchestrator.concurrency(), 2);
        orchestrator
            .run(&beta_range(0.0, 1.0, 8), 0.0, 1.0)
            .await
            .unwrap();
        let executor = &orchestrator.executor;
        assert_eq!(executor.calls.load(Ordering::SeqCst), 8);
        let peak = executor.peak.load(Ordering::SeqCst);
        assert!((1..=2).contains(&peak), "peak concurrency {}", peak);
    }

    #[tokio::test]
    async fn test_chunking_does_not_change_results() {
        let mut context = test_context(3, ScheduleLaw::Linear);
        context.integrator.rtol = 1e-8;
        context.integrator.atol = 1e-8;
        let betas = beta_range(0.1, 3.0, 30);

        let chunked = GridOrchestrator::new(context.clone(), grid(PartitionStrategy::ChunkSize(5), 5));
        let single = GridOrchestrator::new(context, grid(PartitionStrategy::ChunkSize(1), 5));
        let a = chunked.run(&betas, 0.0, 8.0).await.unwrap();
        let b = single.run(&betas, 0.0, 8.0).await.unwrap();

        assert_eq!(a.chunks, 6);
        assert_eq!(b.chunks, 30);
        assert_eq!(a.probability, b.probability);
        for p in a.probability.iter() {
            assert!((0.0..=1.0).contains(p));
        }
    }

    #[tokio::test]
    async fn test_run_dimension_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.paths.data_dir = dir.path().join("data");
        config.paths.output_dir = dir.path().join("out");
        config.grid.time_samples = 4;
        config.grid.adiabatic_check = true;
        config.spectral.samples = 10;

        let store = ArtifactStore::from_config(&config.paths);
        store.save_betas(3, &[0.5, 1.0, 1.5]).unwrap();
        store.save_times(3, &[0.0, 2.0, 4.0, 6.0]).unwrap();

        let output = run_dimension(&config, 3).await.unwrap();
        assert_eq!(store.load_probability(3).unwrap(), output.probability);
        assert_eq!(store.load_adiabatic(3).unwrap().dim(), (3, 4));
        let summary = store.load_summary(3).unwrap();
        assert_eq!(summary.dimension, 3);
        assert_eq!(summary.schedule, ScheduleLaw::Cbrt);
        assert_eq!(summary.times, output.times);
        assert_eq!(summary.chunks, 1);
        assert!(summary.adiabatic_check);
    }
}
