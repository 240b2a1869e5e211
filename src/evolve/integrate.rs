// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Adaptive Dormand–Prince 5(4) integrator for the Schrödinger equation.
//!
//! Integrates i·dψ/dt = H(t)·ψ from ψ(0) = uniform superposition to t = T.
//! Fifth-order propagation with an embedded fourth-order error estimate,
//! first-same-as-last stage reuse and elementary step control:
//!
//!   err = ‖h·Σ E_j K_j / (atol + rtol·max(|y|, |y_new|))‖_rms
//!   h ← h·clamp(0.9·err^(−1/5), 0.2, 10)
//!
//! Ref: Dormand & Prince (1980), J. Comput. Appl. Math. 6, 19.
//! Ref: Hairer, Nørsett, Wanner, "Solving ODEs I" (1993), §II.4.

use ndarray::Array1;
use num_complex::Complex64;
use tracing::trace;

use super::rhs::SchrodingerRhs;
use super::types::{norm_sqr, uniform_superposition, EvolutionResult};
use crate::cancel::CancelToken;
use crate::config::IntegratorConfig;
use crate::error::{NumericalError, Result};
use crate::hamiltonian::RingModel;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;
/// −1 / (embedded order + 1)
const ERROR_EXPONENT: f64 = -1.0 / 5.0;

const C: [f64; 6] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0];

const A: [&[f64]; 6] = [
    &[],
    &[1.0 / 5.0],
    &[3.0 / 40.0, 9.0 / 40.0],
    &[44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0],
    &[
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
    ],
    &[
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
    ],
];

const B: [f64; 6] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
];

/// Difference between fifth- and fourth-order weights, including the FSAL stage.
const E: [f64; 7] = [
    -71.0 / 57600.0,
    0.0,
    71.0 / 16695.0,
    -71.0 / 1920.0,
    17253.0 / 339200.0,
    -22.0 / 525.0,
    1.0 / 40.0,
];

/// Evolve the uniform superposition under H(t; T) for total time T.
///
/// # Arguments
/// * `model`: Ring dimension and schedule law.
/// * `integrator`: Tolerances and step budget.
/// * `beta`: Oracle strength.
/// * `total_time`: T ≥ 0. T = 0 returns ψ(0) without integrating.
///
/// # Returns
/// `EvolutionResult` with ψ(T) (not renormalized) and step diagnostics.
pub fn evolve_state(
    model: &RingModel,
    integrator: &IntegratorConfig,
    beta: f64,
    total_time: f64,
) -> Result<EvolutionResult> {
    evolve_state_cancellable(model, integrator, beta, total_time, &CancelToken::new())
}

/// Like [`evolve_state`], returning `Error::Cancelled` once `cancel` fires.
///
/// The token is polled before every step attempt.
pub fn evolve_state_cancellable(
    model: &RingModel,
    integrator: &IntegratorConfig,
    beta: f64,
    total_time: f64,
    cancel: &CancelToken,
) -> Result<EvolutionResult> {
    cancel.check()?;
    let psi0 = uniform_superposition(model.dimension());
    if total_time == 0.0 {
        return Ok(EvolutionResult::untouched(psi0));
    }

    let rhs = SchrodingerRhs::new(model, beta, total_time);
    let mut solver = DormandPrince::new(rhs, integrator, cancel, psi0, total_time);
    solver.run()?;

    trace!(
        beta,
        total_time,
        accepted = solver.accepted,
        rejected = solver.rejected,
        rhs_evaluations = solver.rhs_evaluations,
        "evolution finished"
    );

    Ok(EvolutionResult {
        norm_sqr: norm_sqr(&solver.y),
        final_state: solver.y,
        accepted_steps: solver.accepted,
        rejected_steps: solver.rejected,
        rhs_evaluations: solver.rhs_evaluations,
    })
}

/// Integrator state for a single run from t = 0 to `t_end`.
struct DormandPrince<'a> {
    rhs: SchrodingerRhs<'a>,
    cancel: &'a CancelToken,
    rtol: f64,
    atol: f64,
    max_steps: usize,
    t_end: f64,
    t: f64,
    y: Array1<Complex64>,
    f: Array1<Complex64>,
    h_abs: f64,
    accepted: usize,
    rejected: usize,
    rhs_evaluations: usize,
}

impl<'a> DormandPrince<'a> {
    fn new(
        rhs: SchrodingerRhs<'a>,
        integrator: &IntegratorConfig,
        cancel: &'a CancelToken,
        y0: Array1<Complex64>,
        t_end: f64,
    ) -> Self {
        let mut solver = Self {
            rhs,
            cancel,
            rtol: integrator.rtol,
            atol: integrator.atol,
            max_steps: integrator.max_steps,
            t_end,
            t: 0.0,
            f: Array1::zeros(y0.len()),
            y: y0,
            h_abs: 0.0,
            accepted: 0,
            rejected: 0,
            rhs_evaluations: 0,
        };
        solver.f = solver.eval(0.0, &solver.y.clone());
        solver.h_abs = solver.initial_step();
        solver
    }

    fn eval(&mut self, t: f64, y: &Array1<Complex64>) -> Array1<Complex64> {
        self.rhs_evaluations += 1;
        self.rhs.eval(t, y)
    }

    /// Starting step from the local Lipschitz estimate (Hairer §II.4).
    fn initial_step(&mut self) -> f64 {
        let interval = self.t_end - self.t;
        let scale = self.y.mapv(|z| self.atol + z.norm() * self.rtol);

        let d0 = rms_norm(&self.y, &scale);
        let d1 = rms_norm(&self.f, &scale);
        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        };
        let h0 = h0.min(interval);

        let mut y1 = self.y.clone();
        y1.scaled_add(Complex64::new(h0, 0.0), &self.f);
        let f1 = self.eval(self.t + h0, &y1);
        let d2 = rms_norm(&(&f1 - &self.f), &scale) / h0;

        let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(-ERROR_EXPONENT)
        };

        (100.0 * h0).min(h1).min(interval)
    }

    fn run(&mut self) -> Result<()> {
        while self.t < self.t_end {
            self.step()?;
        }
        Ok(())
    }

    /// Advance by one accepted step, shrinking `h` on rejection.
    fn step(&mut self) -> Result<()> {
        let min_step = 10.0 * (next_up(self.t) - self.t);
        let mut h_abs = self.h_abs.max(min_step);
        let mut rejected = false;

        loop {
            self.cancel.check()?;
            if h_abs < min_step {
                return Err(NumericalError::StepSizeTooSmall {
                    time: self.t,
                    step: h_abs,
                }
                .into());
            }
            if self.accepted + self.rejected >= self.max_steps {
                return Err(NumericalError::StepLimitExceeded {
                    time: self.t,
                    steps: self.max_steps,
                }
                .into());
            }

            let mut t_new = self.t + h_abs;
            if t_new > self.t_end {
                t_new = self.t_end;
            }
            let h = t_new - self.t;
            h_abs = h;

            let (y_new, f_new, err) = self.attempt(h);
            let scale = ndarray::Zip::from(&self.y)
                .and(&y_new)
                .map_collect(|a, b| self.atol + a.norm().max(b.norm()) * self.rtol);
            let error_norm = rms_norm(&err, &scale);

            if error_norm < 1.0 {
                let mut factor = if error_norm == 0.0 {
                    MAX_FACTOR
                } else {
                    MAX_FACTOR.min(SAFETY * error_norm.powf(ERROR_EXPONENT))
                };
                if rejected {
                    factor = factor.min(1.0);
                }
                self.t = t_new;
                self.y = y_new;
                self.f = f_new;
                self.h_abs = h_abs * factor;
                self.accepted += 1;
                return Ok(());
            }

            h_abs *= MIN_FACTOR.max(SAFETY * error_norm.powf(ERROR_EXPONENT));
            rejected = true;
            self.rejected += 1;
        }
    }

    /// One Dormand–Prince step of size `h`: (y_new, f(t + h, y_new), error estimate).
    fn attempt(
        &mut self,
        h: f64,
    ) -> (Array1<Complex64>, Array1<Complex64>, Array1<Complex64>) {
        let mut k: Vec<Array1<Complex64>> = Vec::with_capacity(7);
        k.push(self.f.clone());

        for stage in 1..6 {
            let y_stage = combine(&self.y, &k, A[stage], h);
            let t_stage = self.t + C[stage] * h;
            let k_stage = self.eval(t_stage, &y_stage);
            k.push(k_stage);
        }

        let y_new = combine(&self.y, &k, &B, h);
        let f_new = self.eval(self.t + h, &y_new);
        k.push(f_new.clone());

        let err = combine(&Array1::zeros(self.y.len()), &k, &E, h);
        (y_new, f_new, err)
    }
}

/// base + h·Σ coeffs_j·k_j
fn combine(
    base: &Array1<Complex64>,
    k: &[Array1<Complex64>],
    coeffs: &[f64],
    h: f64,
) -> Array1<Complex64> {
    let mut out = base.clone();
    for (kj, &c) in k.iter().zip(coeffs) {
        if c != 0.0 {
            out.scaled_add(Complex64::new(c * h, 0.0), kj);
        }
    }
    out
}

/// sqrt(mean(|x_i / scale_i|²))
fn rms_norm(x: &Array1<Complex64>, scale: &Array1<f64>) -> f64 {
    let sum: f64 = x
        .iter()
        .zip(scale.iter())
        .map(|(z, s)| z.norm_sqr() / (s * s))
        .sum();
    (sum / x.len() as f64).sqrt()
}

/// Smallest representable f64 above a finite non-negative `t`.
fn next_up(t: f64) -> f64 {
    f64::from_bits(t.to_bits() + 1)
}
