// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Maximization of the oracle probability over a (β, T) box.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{RunContext, SearchConfig};
use crate::error::Result;
use crate::optimize::{Bounds, GlobalMinimizer, LocalMinimum, MinimizerConfig};
use crate::probability::probability_objective;
use crate::validation::{validate_beta, validate_total_time};

/// A local maximum of p(β, T).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityPeak {
    pub probability: f64,
    pub beta: f64,
    pub total_time: f64,
}

impl From<&LocalMinimum> for ProbabilityPeak {
    fn from(minimum: &LocalMinimum) -> Self {
        Self {
            probability: -minimum.fun,
            beta: minimum.x[0],
            total_time: minimum.x[1],
        }
    }
}

/// Outcome of [`maximize_probability`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Highest probability found
    pub best: ProbabilityPeak,
    /// Distinct local maxima, highest first
    pub peaks: Vec<ProbabilityPeak>,
    /// Probability evaluations performed
    pub evaluations: usize,
    /// Whether `best.probability >= precision`
    pub reached_precision: bool,
}

/// Search `beta_bounds × time_bounds` for the highest oracle probability.
///
/// Stops as soon as a point with probability ≥ `search.precision` is found.
pub fn maximize_probability(
    ctx: &RunContext,
    search: &SearchConfig,
    beta_bounds: (f64, f64),
    time_bounds: (f64, f64),
) -> Result<SearchResult> {
    for beta in [beta_bounds.0, beta_bounds.1] {
        validate_beta(beta)?;
    }
    for time in [time_bounds.0, time_bounds.1] {
        validate_total_time(time)?;
    }

    let bounds = Bounds::new(&[beta_bounds, time_bounds])?;
    let minimizer = GlobalMinimizer::new(
        bounds,
        MinimizerConfig {
            samples: search.samples,
            local_max_iters: search.local_max_iters,
            sd_tolerance: search.sd_tolerance,
            stop_below: Some(-search.precision),
        },
    )?;

    let result = minimizer.minimize(|x| probability_objective(ctx, x[0], x[1]))?;

    let peaks: Vec<ProbabilityPeak> = result.local_minima.iter().map(Into::into).collect();
    let best = ProbabilityPeak {
        probability: -result.fun,
        beta: result.x[0],
        total_time: result.x[1],
    };
    let reached_precision = best.probability >= search.precision;

    info!(
        dimension = ctx.model.dimension(),
        probability = best.probability,
        beta = best.beta,
        total_time = best.total_time,
        peaks = peaks.len(),
        evaluations = result.evaluations,
        reached_precision,
        "probability search finished"
    );

    Ok(SearchResult {
        best,
        peaks,
        evaluations: result.evaluations,
        reached_precision,
    })
}
