// ─────────────────────────────────────────────────────────────────────
// GraphStable — Core Engine
// (C) 2026 The GraphStable Contributors.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Topology model, arc expansion, semiring linear algebra, and the
//! three transition matrices of the GraphStable engine.
//!
//! Architecture:
//!   - Topology: index-addressed vertex arena + weighted multigraph edges
//!   - ArcGraph: doubled and split unit-delay arcs with edge provenance
//!   - Matrix / StateVector: dense row-major storage
//!   - Semiring: ordinary (+, ×) and tropical (max, +) products
//!   - TransitionMatrices: binary M, stochastic P, scattering S
//!
//! # Invariants
//!
//! 1. Every arc in an `ArcGraph` has weight exactly 1 and
//!    `|arcs| = 2 × Σ weights` of the topology it was expanded from.
//! 2. Every matrix built from an `ArcGraph` is square with dimension
//!    `|arcs|`; row/column `i` is arc `i`.
//! 3. Normalisation never divides by zero: a zero row sum is reported
//!    as `NumericDegeneracy`.

pub mod builder;
pub mod expander;
pub mod linalg;
pub mod semiring;
pub mod topology;

pub use builder::{is_clean, TransitionMatrices};
pub use expander::ArcGraph;
pub use linalg::{BracketStyle, Matrix, StateVector};
pub use semiring::{MaxPlus, Ordinary, Semiring};
pub use topology::{Edge, Topology, Vertex, VertexId};
