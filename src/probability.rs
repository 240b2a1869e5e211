// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Oracle-site probability after adiabatic evolution.
//!
//! p(β, T) = |⟨c|ψ(T)⟩|² / ‖ψ(T)‖²
//!
//! The renormalization absorbs the integrator's norm drift. A result that
//! is not a probability is reported as a numerical error, never clipped
//! away silently.

use ndarray::Array1;
use num_complex::Complex64;
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::config::{IntegratorConfig, RunContext};
use crate::error::{NumericalError, Result};
use crate::evolve::{evolve_state_cancellable, norm_sqr};
use crate::hamiltonian::RingModel;

/// Round-off allowance above 1 before a probability is rejected.
pub const PROBABILITY_SLACK: f64 = 1e-12;

/// |ψ_c|² / ‖ψ‖² for the oracle index `oracle`.
pub fn probability_from_state(state: &Array1<Complex64>, oracle: usize) -> Result<f64> {
    let probability = state[oracle].norm_sqr() / norm_sqr(state);
    if !probability.is_finite() || probability > 1.0 + PROBABILITY_SLACK {
        return Err(NumericalError::ProbabilityOutOfBounds { probability }.into());
    }
    Ok(probability.min(1.0))
}

/// Evolve once with the given tolerances and measure the oracle site.
pub fn probability_with(
    model: &RingModel,
    integrator: &IntegratorConfig,
    beta: f64,
    total_time: f64,
    cancel: &CancelToken,
) -> Result<f64> {
    let result = evolve_state_cancellable(model, integrator, beta, total_time, cancel)?;
    probability_from_state(&result.final_state, model.oracle_index())
}

/// Oracle probability p(β, T) with the context's integrator settings.
pub fn evaluate_probability(ctx: &RunContext, beta: f64, total_time: f64) -> Result<f64> {
    probability_with(&ctx.model, &ctx.integrator, beta, total_time, &CancelToken::new())
}

/// −p(β, T), the quantity minimized by the probability search.
pub fn probability_objective(ctx: &RunContext, beta: f64, total_time: f64) -> Result<f64> {
    evaluate_probability(ctx, beta, total_time).map(|p| -p)
}

/// Like [`evaluate_probability`], retrying numerical faults with tighter tolerances.
///
/// Attempt k uses rtol/atol divided by `retry_tightening^k`, for at most
/// `max_retries` extra attempts. Non-numerical errors, cancellation
/// included, return immediately.
pub fn evaluate_with_retry(
    ctx: &RunContext,
    beta: f64,
    total_time: f64,
    cancel: &CancelToken,
) -> Result<f64> {
    let mut attempt = 0;
    loop {
        let integrator = ctx.integrator.tightened(attempt);
        match probability_with(&ctx.model, &integrator, beta, total_time, cancel) {
            Ok(p) => {
                if attempt > 0 {
                    debug!(beta, total_time, attempt, "evaluation recovered after retry");
                }
                return Ok(p);
            }
            Err(e) if e.is_retryable() && attempt < ctx.integrator.max_retries => {
                warn!(
                    beta,
                    total_time,
                    attempt,
                    rtol = integrator.rtol,
                    error = %e,
                    "numerical fault, retrying with tighter tolerances"
                );
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
