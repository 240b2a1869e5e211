// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Right-hand side of the Schrödinger equation: dψ/dt = −i·H(t)·ψ.

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use crate::hamiltonian::RingModel;

/// Time-dependent right-hand side for one (β, T) pair.
///
/// H(t) is rebuilt on every call; nothing is cached between evaluations.
#[derive(Debug, Clone, Copy)]
pub struct SchrodingerRhs<'a> {
    model: &'a RingModel,
    beta: f64,
    total_time: f64,
}

impl<'a> SchrodingerRhs<'a> {
    pub fn new(model: &'a RingModel, beta: f64, total_time: f64) -> Self {
        Self {
            model,
            beta,
            total_time,
        }
    }

    /// −i·H(t)·ψ
    pub fn eval(&self, time: f64, psi: &Array1<Complex64>) -> Array1<Complex64> {
        let h = self.model.time_hamiltonian(self.beta, time, self.total_time);
        apply_real(&h, psi).mapv(|z| Complex64::new(z.im, -z.re))
    }
}

/// Real symmetric matrix times complex vector.
pub fn apply_real(h: &Array2<f64>, psi: &Array1<Complex64>) -> Array1<Complex64> {
    Array1::from_shape_fn(h.nrows(), |i| {
        h.row(i)
            .iter()
            .zip(psi.iter())
            .map(|(&a, &z)| z * a)
            .sum::<Complex64>()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolve::uniform_superposition;
    use crate::hamiltonian::ScheduleLaw;

    #[test]
    fn test_uniform_state_is_stationary_at_start() {
        let model = RingModel::new(6, ScheduleLaw::Cbrt).unwrap();
        let rhs = SchrodingerRhs::new(&model, 2.0, 10.0);
        let f = rhs.eval(0.0, &uniform_superposition(6));
        assert!(f.iter().all(|z| z.norm() < 1e-15));
    }

    #[test]
    fn test_multiplies_by_minus_i() {
        let model = RingModel::new(3, ScheduleLaw::Linear).unwrap();
        let rhs = SchrodingerRhs::new(&model, 1.0, 1.0);
        // At s = 1, H = −β|c⟩⟨c| with c = 1
        let mut psi = Array1::zeros(3);
        psi[1] = Complex64::new(1.0, 0.0);
        let f = rhs.eval(1.0, &psi);
        // −i·(−1)·1 = i
        assert!((f[1] - Complex64::new(0.0, 1.0)).norm() < 1e-15);
        assert_eq!(f[0], Complex64::new(0.0, 0.0));
    }

    #[test]
    fn test_apply_real_matches_manual_product() {
        let h = ndarray::arr2(&[[1.0, 2.0], [2.0, -1.0]]);
        let psi = ndarray::arr1(&[Complex64::new(1.0, 1.0), Complex64::new(0.0, -1.0)]);
        let out = apply_real(&h, &psi);
        assert_eq!(out[0], Complex64::new(1.0, -1.0));
        assert_eq!(out[1], Complex64::new(2.0, 3.0));
    }
}
