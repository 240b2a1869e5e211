// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Evolution inputs and results.

use ndarray::Array1;
use num_complex::Complex64;

/// Uniform superposition ψ(0) = (1/√N, …, 1/√N).
///
/// Ground state of the ring Laplacian.
pub fn uniform_superposition(dimension: usize) -> Array1<Complex64> {
    let amplitude = 1.0 / (dimension as f64).sqrt();
    Array1::from_elem(dimension, Complex64::new(amplitude, 0.0))
}

/// Result of one Schrödinger evolution.
#[derive(Debug, Clone)]
pub struct EvolutionResult {
    /// ψ(T), not renormalized.
    pub final_state: Array1<Complex64>,
    /// ‖ψ(T)‖², drifts from 1 by the integration error.
    pub norm_sqr: f64,
    /// Number of accepted adaptive steps.
    pub accepted_steps: usize,
    /// Number of rejected step attempts.
    pub rejected_steps: usize,
    /// Number of right-hand-side (Hamiltonian) evaluations.
    pub rhs_evaluations: usize,
}

impl EvolutionResult {
    /// Result for T = 0: the initial state, no integration performed.
    pub(crate) fn untouched(state: Array1<Complex64>) -> Self {
        let norm_sqr = norm_sqr(&state);
        Self {
            final_state: state,
            norm_sqr,
            accepted_steps: 0,
            rejected_steps: 0,
            rhs_evaluations: 0,
        }
    }
}

/// ‖ψ‖².
pub fn norm_sqr(state: &Array1<Complex64>) -> f64 {
    state.iter().map(|z| z.norm_sqr()).sum()
}
