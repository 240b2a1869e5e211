// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the ring search engine.

use std::fmt;
use std::time::Duration;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Engine error types.
#[derive(Debug)]
pub enum Error {
    /// Configuration error (unknown schedule law, bad derivative flag, ...)
    Config(String),
    /// Numerical fault during integration or probability evaluation
    Numerical(NumericalError),
    /// Global optimization failed to produce a usable answer
    Optimization(OptimizationError),
    /// A grid task failed, timed out or panicked
    Task(TaskError),
    /// Validation error
    Validation(ValidationError),
    /// IO error
    Io(std::io::Error),
    /// Serialization error
    Serialization(String),
    /// Evaluation stopped by a cancellation request
    Cancelled,
}

impl Error {
    /// Whether a retry with tighter integrator tolerances may resolve the error.
    ///
    /// Configuration errors are never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Numerical(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Numerical(e) => write!(f, "Numerical error: {}", e),
            Error::Optimization(e) => write!(f, "Optimization error: {}", e),
            Error::Task(e) => write!(f, "Task error: {}", e),
            Error::Validation(e) => write!(f, "Validation error: {}", e),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Error::Cancelled => write!(f, "Evaluation cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Numerical(e) => Some(e),
            Error::Optimization(e) => Some(e),
            Error::Task(e) => Some(e),
            Error::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<NumericalError> for Error {
    fn from(e: NumericalError) -> Self {
        Error::Numerical(e)
    }
}

impl From<OptimizationError> for Error {
    fn from(e: OptimizationError) -> Self {
        Error::Optimization(e)
    }
}

impl From<TaskError> for Error {
    fn from(e: TaskError) -> Self {
        Error::Task(e)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Validation(e)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Numerical faults raised by the evolver and the probability evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericalError {
    /// |⟨oracle|ψ⟩|² / ‖ψ‖² is not a valid probability
    ProbabilityOutOfBounds { probability: f64 },
    /// Adaptive step fell below the floating-point resolution of t
    StepSizeTooSmall { time: f64, step: f64 },
    /// Integrator exhausted its step budget before reaching T
    StepLimitExceeded { time: f64, steps: usize },
    /// Hamiltonian has NaN or infinite entries at schedule position s
    NonFiniteHamiltonian { position: f64 },
}

impl fmt::Display for NumericalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericalError::ProbabilityOutOfBounds { probability } => {
                write!(f, "probability out of bounds: {}", probability)
            }
            NumericalError::StepSizeTooSmall { time, step } => {
                write!(f, "step size {:e} too small at t={}", step, time)
            }
            NumericalError::StepLimitExceeded { time, steps } => {
                write!(f, "step limit of {} exceeded at t={}", steps, time)
            }
            NumericalError::NonFiniteHamiltonian { position } => {
                write!(f, "non-finite Hamiltonian at s={}", position)
            }
        }
    }
}

impl std::error::Error for NumericalError {}

/// Global optimization failures.
#[derive(Debug, Clone, PartialEq)]
pub enum OptimizationError {
    /// No sample in the search box produced a finite objective value
    NoFeasibleSample { samples: usize },
    /// Local refinement failed on every candidate
    NotConverged { candidates: usize },
    /// Minimum spectral gap is zero, the adiabatic bound is undefined
    DegenerateGap { beta: f64, position: f64 },
    /// Error reported by the local solver itself
    Solver(String),
}

impl fmt::Display for OptimizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationError::NoFeasibleSample { samples } => {
                write!(f, "no feasible sample among {} points", samples)
            }
            OptimizationError::NotConverged { candidates } => {
                write!(f, "local refinement failed for all {} candidates", candidates)
            }
            OptimizationError::DegenerateGap { beta, position } => {
                write!(f, "spectral gap closes at s={} for beta={}", position, beta)
            }
            OptimizationError::Solver(msg) => write!(f, "solver failure: {}", msg),
        }
    }
}

impl std::error::Error for OptimizationError {}

/// Grid task failures, tagged with the chunk they belong to.
#[derive(Debug)]
pub enum TaskError {
    /// Task returned an error
    Failed { chunk: usize, source: Box<Error> },
    /// Task did not finish within its timeout
    TimedOut { chunk: usize, timeout: Duration },
    /// Task panicked
    Panicked { chunk: usize, message: String },
    /// Task was cancelled by the runtime
    Cancelled { chunk: usize },
}

impl TaskError {
    /// Index of the chunk that failed.
    pub fn chunk(&self) -> usize {
        match self {
            TaskError::Failed { chunk, .. }
            | TaskError::TimedOut { chunk, .. }
            | TaskError::Panicked { chunk, .. }
            | TaskError::Cancelled { chunk } => *chunk,
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::Failed { chunk, source } => {
                write!(f, "chunk {} failed: {}", chunk, source)
            }
            TaskError::TimedOut { chunk, timeout } => {
                write!(f, "chunk {} timed out after {:?}", chunk, timeout)
            }
            TaskError::Panicked { chunk, message } => {
                write!(f, "chunk {} panicked: {}", chunk, message)
            }
            TaskError::Cancelled { chunk } => write!(f, "chunk {} was cancelled", chunk),
        }
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TaskError::Failed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Validation errors.
#[derive(Debug)]
pub enum ValidationError {
    /// Field validation failed
    Field { field: String, message: String },
    /// Input artifact has an unusable shape
    Shape {
        artifact: String,
        expected: String,
        actual: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Field { field, message } => {
                write!(f, "Field '{}': {}", field, message)
            }
            ValidationError::Shape {
                artifact,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Artifact '{}' has shape {}, expected {}",
                    artifact, actual, expected
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}
