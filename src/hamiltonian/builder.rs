// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Ring Hamiltonian construction.
//!
//! H(s, β) = (1 − g(s))·L − g(s)·β·|c⟩⟨c|
//!
//! where L is the Laplacian of the cycle graph on N nodes and c = ⌊(N−1)/2⌋
//! is the oracle site. Every call builds its matrix from scratch.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::schedule::ScheduleLaw;
use crate::error::{Error, Result};
use crate::validation::validate_dimension;

/// Which quantity the schedule-domain builder returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivativeOrder {
    /// H(s)
    Value,
    /// dH/ds
    First,
}

impl TryFrom<u8> for DerivativeOrder {
    type Error = Error;

    fn try_from(flag: u8) -> Result<Self> {
        match flag {
            0 => Ok(DerivativeOrder::Value),
            1 => Ok(DerivativeOrder::First),
            other => Err(Error::Config(format!(
                "unknown derivative order flag {} (expected 0 or 1)",
                other
            ))),
        }
    }
}

/// Immutable description of the system: ring size and schedule law.
///
/// Built once per run and shared read-only by every evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingModel {
    dimension: usize,
    schedule: ScheduleLaw,
}

impl RingModel {
    /// Create a model, rejecting rings with fewer than three nodes.
    pub fn new(dimension: usize, schedule: ScheduleLaw) -> Result<Self> {
        validate_dimension(dimension)?;
        Ok(Self {
            dimension,
            schedule,
        })
    }

    /// Hilbert-space dimension N.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Schedule law used by every builder call.
    pub fn schedule(&self) -> ScheduleLaw {
        self.schedule
    }

    /// Index of the oracle (central) site.
    pub fn oracle_index(&self) -> usize {
        (self.dimension - 1) / 2
    }

    /// Indicator vector of the oracle site.
    pub fn oracle_state(&self) -> Array1<f64> {
        let mut state = Array1::zeros(self.dimension);
        state[self.oracle_index()] = 1.0;
        state
    }

    /// Ring Laplacian L = D − A.
    pub fn laplacian(&self) -> Array2<f64> {
        laplacian(self.dimension)
    }

    /// Time-domain Hamiltonian H(t; T) used by the evolver.
    ///
    /// At t = 0 (and for T = 0) the schedule fraction is taken as zero and
    /// H = L exactly, so the diverging derivative of the sqrt/cbrt laws is
    /// never touched by the integrator's first stage.
    pub fn time_hamiltonian(&self, beta: f64, time: f64, total_time: f64) -> Array2<f64> {
        if time == 0.0 || total_time == 0.0 {
            return self.laplacian();
        }
        let g = self.schedule.value(time / total_time);
        self.interpolate(1.0 - g, g * beta)
    }

    /// Schedule-domain Hamiltonian used by the spectral analyzer.
    pub fn schedule_hamiltonian(&self, beta: f64, s: f64, order: DerivativeOrder) -> Array2<f64> {
        match order {
            DerivativeOrder::Value => {
                let g = self.schedule.value(s);
                self.interpolate(1.0 - g, g * beta)
            }
            DerivativeOrder::First => {
                let dg = self.schedule.derivative(s);
                self.interpolate(-dg, dg * beta)
            }
        }
    }

    /// `weight`·L with `shift` subtracted from the oracle diagonal entry.
    fn interpolate(&self, weight: f64, shift: f64) -> Array2<f64> {
        let mut h = self.laplacian() * weight;
        let c = self.oracle_index();
        h[[c, c]] -= shift;
        h
    }
}

/// Laplacian of the cycle graph: 2 on the diagonal, −1 on both neighbours.
pub fn laplacian(dimension: usize) -> Array2<f64> {
    let mut l = Array2::zeros((dimension, dimension));
    for i in 0..dimension {
        let next = (i + 1) % dimension;
        let prev = (i + dimension - 1) % dimension;
        l[[i, i]] = 2.0;
        l[[i, next]] -= 1.0;
        l[[i, prev]] -= 1.0;
    }
    l
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral::symmetric_eigen;
    use crate::test_utils::assert_matrix_close;
    use approx::assert_relative_eq;

    fn model(n: usize, law: ScheduleLaw) -> RingModel {
        RingModel::new(n, law).unwrap()
    }

    #[test]
    fn test_laplacian_structure() {
        let l = laplacian(5);
        assert_eq!(l[[0, 0]], 2.0);
        assert_eq!(l[[0, 1]], -1.0);
        assert_eq!(l[[0, 4]], -1.0);
        assert_eq!(l[[4, 0]], -1.0);
        assert_eq!(l[[2, 3]], -1.0);
        assert_eq!(l[[0, 2]], 0.0);
    }

    #[test]
    fn test_laplacian_symmetric_with_zero_row_sums() {
        for n in 3..12 {
            let l = laplacian(n);
            assert_eq!(l, l.t());
            for row in l.rows() {
                assert_eq!(row.sum(), 0.0);
            }
        }
    }

    #[test]
    fn test_laplacian_spectrum_nonnegative_single_zero() {
        for n in 3..10 {
            let spectrum = symmetric_eigen(&laplacian(n));
            assert!(spectrum.eigenvalues.iter().all(|&l| l > -1e-10));
            let zeros = spectrum
                .eigenvalues
                .iter()
                .filter(|l| l.abs() < 1e-10)
                .count();
            assert_eq!(zeros, 1, "N={} should have one zero mode", n);
        }
    }

    #[test]
    fn test_triangle_is_complete_graph() {
        let l = laplacian(3);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 2.0 } else { -1.0 };
                assert_eq!(l[[i, j]], expected);
            }
        }
    }

    #[test]
    fn test_oracle_index_is_central() {
        assert_eq!(model(3, ScheduleLaw::Cbrt).oracle_index(), 1);
        assert_eq!(model(6, ScheduleLaw::Cbrt).oracle_index(), 2);
        assert_eq!(model(7, ScheduleLaw::Cbrt).oracle_index(), 3);
        let oracle = model(7, ScheduleLaw::Cbrt).oracle_state();
        assert_eq!(oracle.sum(), 1.0);
        assert_eq!(oracle[3], 1.0);
    }

    #[test]
    fn test_small_rings_rejected() {
        assert!(RingModel::new(2, ScheduleLaw::Linear).is_err());
        assert!(RingModel::new(0, ScheduleLaw::Linear).is_err());
    }

    #[test]
    fn test_start_of_schedule_is_laplacian() {
        for law in ScheduleLaw::ALL {
            let m = model(6, law);
            for &beta in &[0.0, 0.7, 3.0] {
                assert_eq!(m.time_hamiltonian(beta, 0.0, 10.0), m.laplacian());
                assert_eq!(m.time_hamiltonian(beta, 0.0, 0.0), m.laplacian());
                assert_eq!(
                    m.schedule_hamiltonian(beta, 0.0, DerivativeOrder::Value),
                    m.laplacian()
                );
            }
        }
    }

    #[test]
    fn test_end_of_schedule_is_problem_hamiltonian() {
        for law in ScheduleLaw::ALL {
            let m = model(5, law);
            let beta = 1.3;
            let mut expected = Array2::zeros((5, 5));
            expected[[2, 2]] = -beta;
            assert_matrix_close(&m.time_hamiltonian(beta, 4.0, 4.0), &expected, 1e-14);
            assert_matrix_close(
                &m.schedule_hamiltonian(beta, 1.0, DerivativeOrder::Value),
                &expected,
                1e-14,
            );
        }
    }

    #[test]
    fn test_time_and_schedule_variants_agree() {
        let m = model(7, ScheduleLaw::Sqrt);
        let h_time = m.time_hamiltonian(0.8, 2.5, 10.0);
        let h_sched = m.schedule_hamiltonian(0.8, 0.25, DerivativeOrder::Value);
        assert_matrix_close(&h_time, &h_sched, 1e-15);
    }

    #[test]
    fn test_midpoint_linear() {
        let m = model(4, ScheduleLaw::Linear);
        let h = m.schedule_hamiltonian(2.0, 0.5, DerivativeOrder::Value);
        assert_relative_eq!(h[[1, 1]], 0.0);
        assert_relative_eq!(h[[0, 0]], 1.0);
        assert_relative_eq!(h[[0, 1]], -0.5);
    }

    #[test]
    fn test_analytic_derivative_matches_finite_difference() {
        let h = 1e-6;
        for law in ScheduleLaw::ALL {
            let m = model(6, law);
            for &s in &[0.2, 0.5, 0.8] {
                let plus = m.schedule_hamiltonian(1.1, s + h, DerivativeOrder::Value);
                let minus = m.schedule_hamiltonian(1.1, s - h, DerivativeOrder::Value);
                let numeric = (plus - minus) / (2.0 * h);
                let analytic = m.schedule_hamiltonian(1.1, s, DerivativeOrder::First);
                assert_matrix_close(&analytic, &numeric, 1e-6);
            }
        }
    }

    #[test]
    fn test_builder_is_pure() {
        let m = model(9, ScheduleLaw::Cbrt);
        let a = m.time_hamiltonian(0.45, 3.3, 7.0);
        let b = m.time_hamiltonian(0.45, 3.3, 7.0);
        assert_eq!(a, b);
        let da = m.schedule_hamiltonian(0.45, 0.3, DerivativeOrder::First);
        let db = m.schedule_hamiltonian(0.45, 0.3, DerivativeOrder::First);
        assert_eq!(da, db);
    }

    #[test]
    fn test_derivative_flag_parsing() {
        assert_eq!(DerivativeOrder::try_from(0).unwrap(), DerivativeOrder::Value);
        assert_eq!(DerivativeOrder::try_from(1).unwrap(), DerivativeOrder::First);
        let err = DerivativeOrder::try_from(2).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
