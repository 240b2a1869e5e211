// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Adiabatic quantum search on a ring.
//!
//! A walker on the cycle graph of N nodes is driven from the graph
//! Laplacian to an oracle projector along a schedule s(t). This crate
//! evaluates the probability of finding the oracle node after a total
//! evolution time T, estimates the adiabatic time from the spectral gap,
//! and sweeps the (β, T) plane in parallel.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Grid Orchestrator (tokio)         │
//! ├─────────────────────────────────────────┤
//! │        Grid Evaluator (rayon)            │
//! ├──────────────────┬──────────────────────┤
//! │ Probability      │ Spectral Analyzer    │
//! │ (RK45 evolver)   │ (global optimizer)   │
//! ├──────────────────┴──────────────────────┤
//! │     Hamiltonian Builder + Schedules      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`hamiltonian`]: Ring Laplacian, oracle term, schedule laws
//! - [`evolve`]: Adaptive Runge–Kutta Schrödinger integration
//! - [`probability`]: Oracle-site probability p(β, T)
//! - [`spectral`]: Energy gap, gamma and adiabatic time
//! - [`optimize`]: Bounded global minimization
//! - [`grid`]: Partitioned, concurrent grid evaluation
//! - [`search`]: Probability maximization over (β, T)
//! - [`io`]: Grid artifacts on disk
//! - [`cancel`]: Cooperative cancellation of blocking work
//! - [`config`]: Configuration management
//! - [`validation`]: Input validation utilities
//! - [`error`]: Error types

pub mod cancel;
pub mod config;
pub mod error;
pub mod evolve;
pub mod grid;
pub mod hamiltonian;
pub mod io;
pub mod optimize;
pub mod probability;
pub mod search;
pub mod spectral;
pub mod validation;

pub use config::{Config, RunContext};
pub use error::{Error, Result};
pub use hamiltonian::{RingModel, ScheduleLaw};

#[cfg(test)]
pub mod test_utils;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
