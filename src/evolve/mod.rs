// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Closed-system state evolution.
//!
//! Solves the time-dependent Schrödinger equation
//!
//!   i·dψ/dt = H(t/T, β)·ψ,   ψ(0) = (1/√N, …, 1/√N)
//!
//! with an adaptive embedded Runge–Kutta method. Only ψ(T) is kept; no
//! trajectory is stored and the final state is not renormalized.
//!
//! - [`integrate`]: Dormand–Prince 5(4) with automatic step control
//! - [`rhs`]: −i·H(t)·ψ with H rebuilt at every evaluation
//! - [`types`]: initial state and result types

pub mod integrate;
pub mod rhs;
pub mod types;

pub use integrate::{evolve_state, evolve_state_cancellable};
pub use types::{norm_sqr, uniform_superposition, EvolutionResult};
