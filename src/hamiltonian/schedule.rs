// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Schedule laws g(s) interpolating from the diffusion operator (s = 0)
//! to the problem Hamiltonian (s = 1).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Interpolation law applied to the normalized fraction s = t/T ∈ [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleLaw {
    /// g(s) = s
    Linear,
    /// g(s) = √s
    Sqrt,
    /// g(s) = ∛s
    #[default]
    Cbrt,
}

impl ScheduleLaw {
    /// All supported laws.
    pub const ALL: [ScheduleLaw; 3] = [ScheduleLaw::Linear, ScheduleLaw::Sqrt, ScheduleLaw::Cbrt];

    /// g(s).
    pub fn value(self, s: f64) -> f64 {
        match self {
            ScheduleLaw::Linear => s,
            ScheduleLaw::Sqrt => s.sqrt(),
            ScheduleLaw::Cbrt => s.cbrt(),
        }
    }

    /// Analytic derivative g′(s).
    ///
    /// Diverges at s = 0 for the sqrt and cbrt laws.
    pub fn derivative(self, s: f64) -> f64 {
        match self {
            ScheduleLaw::Linear => 1.0,
            ScheduleLaw::Sqrt => 1.0 / (2.0 * s.sqrt()),
            ScheduleLaw::Cbrt => 1.0 / (3.0 * s.cbrt() * s.cbrt()),
        }
    }

    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleLaw::Linear => "linear",
            ScheduleLaw::Sqrt => "sqrt",
            ScheduleLaw::Cbrt => "cbrt",
        }
    }
}

impl fmt::Display for ScheduleLaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleLaw {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" | "1" => Ok(ScheduleLaw::Linear),
            "sqrt" | "2" => Ok(ScheduleLaw::Sqrt),
            "cbrt" | "3" => Ok(ScheduleLaw::Cbrt),
            other => Err(Error::Config(format!(
                "unknown schedule law '{}' (expected linear, sqrt or cbrt)",
                other
            ))),
        }
    }
}
