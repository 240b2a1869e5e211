// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Low-discrepancy (Halton) sampling of a bounded box.
//!
//! Ref: Halton (1960), Numer. Math. 2, 84.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Bases of the Halton sequence, one per dimension.
const PRIMES: [u64; 8] = [2, 3, 5, 7, 11, 13, 17, 19];

/// Axis-aligned search box `[lower_i, upper_i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Bounds {
    /// Box from `(lower, upper)` pairs, one per dimension.
    pub fn new(limits: &[(f64, f64)]) -> Result<Self> {
        if limits.is_empty() || limits.len() > PRIMES.len() {
            return Err(Error::Config(format!(
                "search box must have 1..={} dimensions, got {}",
                PRIMES.len(),
                limits.len()
            )));
        }
        for (i, &(lo, hi)) in limits.iter().enumerate() {
            if !(lo.is_finite() && hi.is_finite()) || lo > hi {
                return Err(Error::Config(format!(
                    "invalid bounds [{}, {}] for dimension {}",
                    lo, hi, i
                )));
            }
        }
        Ok(Self {
            lower: limits.iter().map(|l| l.0).collect(),
            upper: limits.iter().map(|l| l.1).collect(),
        })
    }

    /// The unit interval [0, 1].
    pub fn unit_interval() -> Self {
        Self {
            lower: vec![0.0],
            upper: vec![1.0],
        }
    }

    pub fn dimensions(&self) -> usize {
        self.lower.len()
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Edge lengths of the box.
    pub fn widths(&self) -> Vec<f64> {
        self.lower
            .iter()
            .zip(&self.upper)
            .map(|(lo, hi)| hi - lo)
            .collect()
    }

    /// Project `x` onto the box.
    pub fn clamp(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(&v, (&lo, &hi))| v.clamp(lo, hi))
            .collect()
    }

    /// Map a point of the unit cube into the box.
    pub fn scale(&self, unit: &[f64]) -> Vec<f64> {
        unit.iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(&u, (&lo, &hi))| lo + u * (hi - lo))
            .collect()
    }

    /// Euclidean distance after normalizing every edge to unit length.
    pub fn normalized_distance(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .zip(self.widths())
            .map(|((x, y), w)| if w > 0.0 { (x - y) / w } else { 0.0 })
            .map(|d| d * d)
            .sum::<f64>()
            .sqrt()
    }
}

/// Van der Corput radical inverse of `index` in `base`.
pub fn radical_inverse(mut index: u64, base: u64) -> f64 {
    let inv_base = 1.0 / base as f64;
    let mut factor = inv_base;
    let mut value = 0.0;
    while index > 0 {
        value += (index % base) as f64 * factor;
        index /= base;
        factor *= inv_base;
    }
    value
}

/// First `count` Halton points in the box.
///
/// The sequence starts at index 1, so the lower corner is never sampled
/// and every coordinate lies strictly inside a non-degenerate edge.
pub fn halton_points(bounds: &Bounds, count: usize) -> Vec<Vec<f64>> {
    (1..=count as u64)
        .map(|index| {
            let unit: Vec<f64> = PRIMES[..bounds.dimensions()]
                .iter()
                .map(|&base| radical_inverse(index, base))
                .collect();
            bounds.scale(&unit)
        })
        .collect()
}
