// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Spectral analysis along the schedule and the adiabatic condition.
//!
//! For a fixed β the adiabatic theorem asks the total time T to exceed
//!
//!   T_ad = max_s |⟨φ₁(s)| dH/ds |φ₀(s)⟩| / min_s (λ₁(s) − λ₀(s))²
//!
//! where φ₀, φ₁ are the two lowest eigenvectors of H(s). Both extrema are
//! found with the global minimizer over s ∈ [0, 1].
//!
//! Ref: Messiah, "Quantum Mechanics" Vol. II (1962), ch. XVII.
//! Ref: Albash & Lidar (2018), Rev. Mod. Phys. 90, 015002.

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{RunContext, SpectralConfig};
use crate::error::{NumericalError, OptimizationError, Result};
use crate::hamiltonian::{DerivativeOrder, RingModel};
use crate::optimize::{Bounds, GlobalMinimizer, MinimizerConfig};

/// Gaps at or below this value are treated as closed.
pub const DEGENERATE_GAP: f64 = 1e-12;

/// Eigen-decomposition of a real symmetric matrix, sorted ascending.
#[derive(Debug, Clone)]
pub struct Spectrum {
    /// Eigenvalues, ascending.
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors as columns, in the order of `eigenvalues`.
    pub eigenvectors: Array2<f64>,
}

impl Spectrum {
    /// λ₁ − λ₀.
    pub fn gap(&self) -> f64 {
        self.eigenvalues[1] - self.eigenvalues[0]
    }

    /// φ₀
    pub fn ground_state(&self) -> ArrayView1<'_, f64> {
        self.eigenvectors.column(0)
    }

    /// φ₁
    pub fn first_excited(&self) -> ArrayView1<'_, f64> {
        self.eigenvectors.column(1)
    }
}

/// Sorted eigen-decomposition of a finite real symmetric matrix.
pub fn symmetric_eigen(matrix: &Array2<f64>) -> Spectrum {
    let n = matrix.nrows();
    let dense = DMatrix::from_fn(n, n, |i, j| matrix[[i, j]]);
    let eigen = SymmetricEigen::new(dense);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

    let eigenvalues = Array1::from_shape_fn(n, |k| eigen.eigenvalues[order[k]]);
    let eigenvectors = Array2::from_shape_fn((n, n), |(i, k)| eigen.eigenvectors[(i, order[k])]);
    Spectrum {
        eigenvalues,
        eigenvectors,
    }
}

/// Sorted spectrum of H(s).
pub fn spectrum(model: &RingModel, beta: f64, s: f64) -> Result<Spectrum> {
    let h = model.schedule_hamiltonian(beta, s, DerivativeOrder::Value);
    if h.iter().any(|x| !x.is_finite()) {
        return Err(NumericalError::NonFiniteHamiltonian { position: s }.into());
    }
    Ok(symmetric_eigen(&h))
}

/// λ₁(s) − λ₀(s).
pub fn energy_gap(model: &RingModel, beta: f64, s: f64) -> Result<f64> {
    Ok(spectrum(model, beta, s)?.gap())
}

/// |⟨φ₁| dH/ds |φ₀⟩| at s.
///
/// Infinite where the schedule derivative diverges (s = 0 for the sqrt and
/// cbrt laws).
pub fn gamma(model: &RingModel, beta: f64, s: f64) -> Result<f64> {
    let dh = model.schedule_hamiltonian(beta, s, DerivativeOrder::First);
    if dh.iter().any(|x| !x.is_finite()) {
        return Ok(f64::INFINITY);
    }
    let spec = spectrum(model, beta, s)?;
    let coupling = spec.first_excited().dot(&dh.dot(&spec.ground_state()));
    Ok(coupling.abs())
}

/// Adiabatic time bound for one β.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdiabaticEstimate {
    pub beta: f64,
    /// max_s γ(s)
    pub gamma_max: f64,
    /// argmax_s γ(s)
    pub gamma_position: f64,
    /// min_s Δ(s)
    pub gap_min: f64,
    /// argmin_s Δ(s)
    pub gap_position: f64,
    /// γ_max / Δ_min²
    pub adiabatic_time: f64,
}

impl AdiabaticEstimate {
    /// Locate the extrema of γ and Δ over s ∈ [0, 1].
    ///
    /// Does not depend on T; compute once per β.
    pub fn compute(model: &RingModel, config: &SpectralConfig, beta: f64) -> Result<Self> {
        let minimizer = GlobalMinimizer::new(
            Bounds::unit_interval(),
            MinimizerConfig {
                samples: config.samples,
                local_max_iters: config.local_max_iters,
                sd_tolerance: config.sd_tolerance,
                stop_below: None,
            },
        )?;

        let gamma_run = minimizer.minimize(|s| gamma(model, beta, s[0]).map(|g| -g))?;
        let gap_run = minimizer.minimize(|s| energy_gap(model, beta, s[0]))?;

        let gamma_max = -gamma_run.fun;
        let gap_min = gap_run.fun;
        if gap_min <= DEGENERATE_GAP {
            return Err(OptimizationError::DegenerateGap {
                beta,
                position: gap_run.x[0],
            }
            .into());
        }

        let estimate = Self {
            beta,
            gamma_max,
            gamma_position: gamma_run.x[0],
            gap_min,
            gap_position: gap_run.x[0],
            adiabatic_time: gamma_max / (gap_min * gap_min),
        };
        debug!(
            beta,
            gamma_max,
            gap_min,
            adiabatic_time = estimate.adiabatic_time,
            evaluations = gamma_run.evaluations + gap_run.evaluations,
            "adiabatic estimate"
        );
        Ok(estimate)
    }

    /// T ≥ T_ad.
    pub fn is_adiabatic(&self, total_time: f64) -> bool {
        total_time >= self.adiabatic_time
    }

    /// 1 when adiabatic, 0 otherwise.
    pub fn flag(&self, total_time: f64) -> u8 {
        u8::from(self.is_adiabatic(total_time))
    }
}

/// 1 if (β, T) satisfies the adiabatic condition, else 0.
pub fn adiabatic_theorem_check(ctx: &RunContext, beta: f64, total_time: f64) -> Result<u8> {
    let estimate = AdiabaticEstimate::compute(&ctx.model, &ctx.spectral, beta)?;
    Ok(estimate.flag(total_time))
}
