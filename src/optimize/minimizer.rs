// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bounded derivative-free global minimization.
//!
//! Two phases:
//!
//! 1. Evaluate the objective on a Halton sample of the box and keep the
//!    samples that are no worse than their nearest neighbours.
//! 2. Refine each such candidate with a bounded Nelder–Mead simplex.
//!
//! Non-finite objective values mark a point infeasible. Errors raised by
//! the objective abort the whole minimization and are returned unchanged.

use std::sync::atomic::{AtomicUsize, Ordering};

use argmin::core::{CostFunction, Executor, State};
use argmin::solver::neldermead::NelderMead;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::sampling::{halton_points, Bounds};
use crate::error::{Error, OptimizationError, Result};

/// Initial simplex edge as a fraction of the box width.
const SIMPLEX_FRACTION: f64 = 0.05;

/// Normalized distance under which two local minima are the same point.
const MERGE_DISTANCE: f64 = 1e-4;

/// Settings of one global minimization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimizerConfig {
    /// Halton samples in the box
    pub samples: usize,
    /// Nelder–Mead iterations per candidate
    pub local_max_iters: u64,
    /// Simplex standard-deviation tolerance
    pub sd_tolerance: f64,
    /// Stop as soon as a value ≤ this target is found
    pub stop_below: Option<f64>,
}

impl Default for MinimizerConfig {
    fn default() -> Self {
        Self {
            samples: 25,
            local_max_iters: 200,
            sd_tolerance: 1e-10,
            stop_below: None,
        }
    }
}

/// A refined local minimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalMinimum {
    pub x: Vec<f64>,
    pub fun: f64,
}

/// Result of [`GlobalMinimizer::minimize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimizeResult {
    /// Best point found
    pub x: Vec<f64>,
    /// Objective value at `x`
    pub fun: f64,
    /// Objective evaluations, sampling and refinement
    pub evaluations: usize,
    /// Distinct local minima, best first
    pub local_minima: Vec<LocalMinimum>,
    /// Whether `stop_below` ended the search
    pub stopped_early: bool,
}

/// Sampling + local refinement minimizer over a fixed box.
#[derive(Debug, Clone)]
pub struct GlobalMinimizer {
    bounds: Bounds,
    config: MinimizerConfig,
}

impl GlobalMinimizer {
    pub fn new(bounds: Bounds, config: MinimizerConfig) -> Result<Self> {
        if config.samples == 0 {
            return Err(Error::Config("minimizer needs at least one sample".into()));
        }
        if !(config.sd_tolerance.is_finite() && config.sd_tolerance > 0.0) {
            return Err(Error::Config(
                "minimizer sd_tolerance must be a positive finite number".into(),
            ));
        }
        Ok(Self { bounds, config })
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Minimize `objective` over the box.
    pub fn minimize<F>(&self, objective: F) -> Result<MinimizeResult>
    where
        F: Fn(&[f64]) -> Result<f64> + Sync,
    {
        let evaluations = AtomicUsize::new(0);
        let points = halton_points(&self.bounds, self.config.samples);

        let values = points
            .par_iter()
            .map(|x| {
                evaluations.fetch_add(1, Ordering::Relaxed);
                objective(x).map(feasible)
            })
            .collect::<Result<Vec<f64>>>()?;

        let feasible_count = values.iter().filter(|v| v.is_finite()).count();
        if feasible_count == 0 {
            return Err(OptimizationError::NoFeasibleSample {
                samples: points.len(),
            }
            .into());
        }

        let mut minima: Vec<LocalMinimum> = Vec::new();

        // Early exit on the sample itself
        if let Some(target) = self.config.stop_below {
            if let Some(best) = best_sample(&points, &values).filter(|b| b.fun <= target) {
                debug!(fun = best.fun, "target reached during sampling");
                return Ok(self.finish(vec![best], &evaluations, true));
            }
        }

        let candidates = self.candidates(&points, &values);
        debug!(
            samples = points.len(),
            feasible = feasible_count,
            candidates = candidates.len(),
            "starting local refinement"
        );

        let mut failures = 0;
        for start in &candidates {
            match self.refine(&objective, start, &evaluations) {
                Ok(minimum) => {
                    let reached = self
                        .config
                        .stop_below
                        .is_some_and(|target| minimum.fun <= target);
                    self.insert(&mut minima, minimum);
                    if reached {
                        return Ok(self.finish(minima, &evaluations, true));
                    }
                }
                Err(Error::Optimization(e)) => {
                    warn!(start = ?start.x, error = %e, "local refinement failed");
                    failures += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if minima.is_empty() {
            return Err(OptimizationError::NotConverged {
                candidates: failures,
            }
            .into());
        }

        Ok(self.finish(minima, &evaluations, false))
    }

    /// Feasible samples no worse than their 2·d nearest feasible neighbours, best first.
    fn candidates(&self, points: &[Vec<f64>], values: &[f64]) -> Vec<LocalMinimum> {
        let feasible: Vec<usize> = (0..points.len())
            .filter(|&i| values[i].is_finite())
            .collect();
        let neighbours = (2 * self.bounds.dimensions()).min(feasible.len() - 1);

        let mut out: Vec<LocalMinimum> = feasible
            .iter()
            .filter(|&&i| {
                let mut dist: Vec<(f64, usize)> = feasible
                    .iter()
                    .filter(|&&j| j != i)
                    .map(|&j| (self.bounds.normalized_distance(&points[i], &points[j]), j))
                    .collect();
                dist.sort_by(|a, b| a.0.total_cmp(&b.0));
                dist.iter()
                    .take(neighbours)
                    .all(|&(_, j)| values[i] <= values[j])
            })
            .map(|&i| LocalMinimum {
                x: points[i].clone(),
                fun: values[i],
            })
            .collect();

        out.sort_by(|a, b| a.fun.total_cmp(&b.fun));
        out
    }

    /// Bounded Nelder–Mead from `start`.
    fn refine<F>(
        &self,
        objective: &F,
        start: &LocalMinimum,
        evaluations: &AtomicUsize,
    ) -> Result<LocalMinimum>
    where
        F: Fn(&[f64]) -> Result<f64>,
    {
        let problem = BoxedObjective {
            objective,
            bounds: &self.bounds,
            evaluations,
        };
        let solver = NelderMead::new(self.initial_simplex(&start.x))
            .with_sd_tolerance(self.config.sd_tolerance)
            .map_err(|e| OptimizationError::Solver(e.to_string()))?;

        let result = Executor::new(problem, solver)
            .configure(|state| state.max_iters(self.config.local_max_iters))
            .run()
            .map_err(recover_error)?;

        let state = result.state();
        let best = match state.get_best_param() {
            Some(x) => self.bounds.clamp(x),
            None => return Err(OptimizationError::Solver("no best parameter".into()).into()),
        };
        let fun = state.get_best_cost();

        // Refinement never loses the starting sample
        if fun.is_finite() && fun <= start.fun {
            Ok(LocalMinimum { x: best, fun })
        } else {
            Ok(start.clone())
        }
    }

    /// Start vertex plus one vertex per axis, stepped towards the box interior.
    fn initial_simplex(&self, x: &[f64]) -> Vec<Vec<f64>> {
        let mut simplex = vec![x.to_vec()];
        for (axis, width) in self.bounds.widths().into_iter().enumerate() {
            let mut vertex = x.to_vec();
            let step = SIMPLEX_FRACTION * width;
            vertex[axis] = if x[axis] + step <= self.bounds.upper()[axis] {
                x[axis] + step
            } else {
                x[axis] - step
            };
            simplex.push(vertex);
        }
        simplex
    }

    /// Add `candidate` unless an equivalent minimum is already known.
    fn insert(&self, minima: &mut Vec<LocalMinimum>, candidate: LocalMinimum) {
        let duplicate = minima.iter_mut().find(|m| {
            self.bounds.normalized_distance(&m.x, &candidate.x) < MERGE_DISTANCE
        });
        match duplicate {
            Some(existing) if candidate.fun < existing.fun => *existing = candidate,
            Some(_) => {}
            None => minima.push(candidate),
        }
    }

    fn finish(
        &self,
        mut minima: Vec<LocalMinimum>,
        evaluations: &AtomicUsize,
        stopped_early: bool,
    ) -> MinimizeResult {
        minima.sort_by(|a, b| a.fun.total_cmp(&b.fun));
        let best = minima[0].clone();
        MinimizeResult {
            x: best.x,
            fun: best.fun,
            evaluations: evaluations.load(Ordering::Relaxed),
            local_minima: minima,
            stopped_early,
        }
    }
}

/// Lowest finite sample.
fn best_sample(points: &[Vec<f64>], values: &[f64]) -> Option<LocalMinimum> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, &fun)| LocalMinimum {
            x: points[i].clone(),
            fun,
        })
}

/// Non-finite values become +∞ (infeasible).
fn feasible(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        f64::INFINITY
    }
}

/// Pull our own error back out of the solver's error, if that is what it was.
fn recover_error(err: argmin::core::Error) -> Error {
    match err.downcast::<Error>() {
        Ok(domain) => domain,
        Err(other) => OptimizationError::Solver(other.to_string()).into(),
    }
}

/// Objective restricted to the box, as seen by the local solver.
struct BoxedObjective<'a, F> {
    objective: &'a F,
    bounds: &'a Bounds,
    evaluations: &'a AtomicUsize,
}

impl<F> CostFunction for BoxedObjective<'_, F>
where
    F: Fn(&[f64]) -> Result<f64>,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
        let x = self.bounds.clamp(param);
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        match (self.objective)(&x) {
            Ok(value) => Ok(feasible(value)),
            Err(e) => Err(argmin::core::Error::new(e)),
        }
    }
}
