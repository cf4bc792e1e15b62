// ─────────────────────────────────────────────────────────────────────
// GraphStable — Semirings
// ─────────────────────────────────────────────────────────────────────
//! The two algebraic structures state vectors are iterated in.
//!
//! Both products share one kernel in `linalg`; a semiring only supplies
//! its additive identity, its "addition" and its "multiplication".

use graphstable_types::{GraphResult, Mode};

use crate::linalg::{Matrix, StateVector};

/// A commutative semiring over `f64`.
pub trait Semiring {
    /// Identity of `add`.
    fn zero() -> f64;
    fn add(a: f64, b: f64) -> f64;
    fn mul(a: f64, b: f64) -> f64;
}

/// Ordinary sum-of-products: (+, ×).
pub struct Ordinary;

impl Semiring for Ordinary {
    #[inline]
    fn zero() -> f64 {
        0.0
    }

    #[inline]
    fn add(a: f64, b: f64) -> f64 {
        a + b
    }

    #[inline]
    fn mul(a: f64, b: f64) -> f64 {
        a * b
    }
}

/// Tropical max-plus: (max, +).
///
/// Matrix zeros are ordinary entries here, not −∞; −∞ only seeds the
/// fold so the result of a non-empty row is the plain maximum.
pub struct MaxPlus;

impl Semiring for MaxPlus {
    #[inline]
    fn zero() -> f64 {
        f64::NEG_INFINITY
    }

    #[inline]
    fn add(a: f64, b: f64) -> f64 {
        a.max(b)
    }

    #[inline]
    fn mul(a: f64, b: f64) -> f64 {
        a + b
    }
}

/// `matrix · vector` in the semiring selected at runtime.
pub fn apply(mode: Mode, matrix: &Matrix, vector: &StateVector) -> GraphResult<StateVector> {
    match mode {
        Mode::Ordinary => matrix.mul_vector::<Ordinary>(vector),
        Mode::MaxPlus => matrix.mul_vector::<MaxPlus>(vector),
    }
}

/// `left · right` in the semiring selected at runtime.
pub fn product(mode: Mode, left: &Matrix, right: &Matrix) -> GraphResult<Matrix> {
    match mode {
        Mode::Ordinary => left.mul_matrix::<Ordinary>(right),
        Mode::MaxPlus => left.mul_matrix::<MaxPlus>(right),
    }
}

/// Apply `matrix` `steps` times without touching `vector`.
pub fn look_ahead(
    mode: Mode,
    matrix: &Matrix,
    vector: &StateVector,
    steps: usize,
) -> GraphResult<StateVector> {
    let mut out = vector.clone();
    for _ in 0..steps {
        out = apply(mode, matrix, &out)?;
    }
    Ok(out)
}
