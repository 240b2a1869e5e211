// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Global optimization over bounded boxes.
//!
//! Used for the extrema of the spectral quantities along the schedule and
//! for the search of the most favourable (β, T) pair.
//!
//! - [`sampling`]: search boxes and Halton sequences
//! - [`minimizer`]: sampling + Nelder–Mead refinement (argmin)

pub mod minimizer;
pub mod sampling;

pub use minimizer::{GlobalMinimizer, LocalMinimum, MinimizeResult, MinimizerConfig};
pub use sampling::{halton_points, Bounds};
