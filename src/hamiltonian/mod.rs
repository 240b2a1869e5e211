// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Hamiltonians for adiabatic search on a cycle graph.
//!
//! The search Hamiltonian interpolates between the ring Laplacian (a
//! diffusion operator whose ground state is the uniform superposition) and
//! a problem Hamiltonian that lowers the energy of a single oracle site:
//!
//!   H(s, β) = (1 − g(s))·L − g(s)·β·|c⟩⟨c|
//!
//! - [`schedule`]: interpolation laws g(s) and their analytic derivatives
//! - [`builder`]: Laplacian, time-domain and schedule-domain builders
//!
//! # References
//!
//! - Farhi, Goldstone, Gutmann, Sipser (2000), "Quantum Computation by
//!   Adiabatic Evolution", arXiv:quant-ph/0001106
//! - Roland & Cerf (2002), "Quantum search by local adiabatic evolution",
//!   Phys. Rev. A 65, 042308

pub mod builder;
pub mod schedule;

pub use builder::{laplacian, DerivativeOrder, RingModel};
pub use schedule::ScheduleLaw;
