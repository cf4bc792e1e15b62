// ─────────────────────────────────────────────────────────────────────
// GraphStable — Dense Matrix and State Vector
// ─────────────────────────────────────────────────────────────────────
//! Row-major dense storage with semiring-generic products.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use graphstable_types::{GraphError, GraphResult};

use crate::semiring::Semiring;

/// Bracket pair used by nested tensor notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BracketStyle {
    /// `[[0,1],[1,0]]`
    #[default]
    Square,
    /// `{{0,1},{1,0}}`
    Curly,
}

impl BracketStyle {
    fn pair(self) -> (char, char) {
        match self {
            BracketStyle::Square => ('[', ']'),
            BracketStyle::Curly => ('{', '}'),
        }
    }
}

/// Dense `rows × cols` matrix, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct RawMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = GraphError;

    fn try_from(raw: RawMatrix) -> GraphResult<Self> {
        if raw.rows.checked_mul(raw.cols) != Some(raw.data.len()) {
            return Err(GraphError::DimensionMismatch {
                left: (raw.rows, raw.cols),
                right: (raw.data.len(), 1),
            });
        }
        Ok(Self {
            rows: raw.rows,
            cols: raw.cols,
            data: raw.data,
        })
    }
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn square(n: usize) -> Self {
        Self::zeros(n, n)
    }

    /// Build from nested rows; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> GraphResult<Self> {
        let r = rows.len();
        let c = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(r * c);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != c {
                return Err(GraphError::DimensionMismatch {
                    left: (i, row.len()),
                    right: (r, c),
                });
            }
            data.extend(row);
        }
        Ok(Self {
            rows: r,
            cols: c,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn row_sum(&self, i: usize) -> f64 {
        self.row(i).iter().sum()
    }

    pub fn column_sum(&self, j: usize) -> f64 {
        (0..self.rows).map(|i| self[(i, j)]).sum()
    }

    pub fn transpose(&self) -> Self {
        let mut out = Self::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out[(j, i)] = self[(i, j)];
            }
        }
        out
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows).map(|i| self.row(i).to_vec()).collect()
    }

    /// `self · right` in semiring `S`.
    pub fn mul_matrix<S: Semiring>(&self, right: &Matrix) -> GraphResult<Matrix> {
        if self.cols != right.rows {
            return Err(GraphError::DimensionMismatch {
                left: self.shape(),
                right: right.shape(),
            });
        }
        let mut out = Matrix::zeros(self.rows, right.cols);
        for i in 0..self.rows {
            let lhs = self.row(i);
            for j in 0..right.cols {
                let mut acc = S::zero();
                for (k, &a) in lhs.iter().enumerate() {
                    acc = S::add(acc, S::mul(a, right[(k, j)]));
                }
                out[(i, j)] = acc;
            }
        }
        Ok(out)
    }

    /// `self · v` in semiring `S`.
    pub fn mul_vector<S: Semiring>(&self, v: &StateVector) -> GraphResult<StateVector> {
        if self.cols != v.len() {
            return Err(GraphError::DimensionMismatch {
                left: self.shape(),
                right: (v.len(), 1),
            });
        }
        let out = (0..self.rows)
            .map(|i| {
                self.row(i)
                    .iter()
                    .zip(v.as_slice())
                    .fold(S::zero(), |acc, (&a, &x)| S::add(acc, S::mul(a, x)))
            })
            .collect();
        Ok(StateVector(out))
    }

    /// Nested-bracket tensor notation for external algebra tools.
    ///
    /// Numbers use the shortest round-trip decimal form with `.` as the
    /// separator; integral values are written without a fraction.
    pub fn to_nested_brackets(&self, style: BracketStyle) -> String {
        let (open, close) = style.pair();
        let mut out = String::with_capacity(2 + self.data.len() * 4);
        out.push(open);
        for i in 0..self.rows {
            if i > 0 {
                out.push(',');
            }
            out.push(open);
            for (j, &x) in self.row(i).iter().enumerate() {
                if j > 0 {
                    out.push(',');
                }
                out.push_str(&tensor_number(x));
            }
            out.push(close);
        }
        out.push(close);
        out
    }
}

fn tensor_number(x: f64) -> String {
    // -0.0 prints as "-0"
    let x = if x == 0.0 { 0.0 } else { x };
    format!("{x}")
}

fn display_number(x: f64) -> String {
    let x = if x == 0.0 { 0.0 } else { x };
    if x.fract() == 0.0 && x.is_finite() {
        format!("{x:.0}")
    } else {
        format!("{x:.3}")
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[i * self.cols + j]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.data[i * self.cols + j]
    }
}

/// Space-separated rows; integral entries bare, others to 3 decimals.
impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.rows {
            if i > 0 {
                writeln!(f)?;
            }
            let cells: Vec<String> = self.row(i).iter().map(|&x| display_number(x)).collect();
            write!(f, "{}", cells.join(" "))?;
        }
        Ok(())
    }
}

/// Column state vector over arcs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateVector(Vec<f64>);

impl StateVector {
    pub fn zeros(n: usize) -> Self {
        Self(vec![0.0; n])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn get(&self, i: usize) -> Option<f64> {
        self.0.get(i).copied()
    }

    pub fn set(&mut self, i: usize, value: f64) {
        self.0[i] = value;
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Components that are exactly non-zero (the active support).
    pub fn nonzero_count(&self) -> usize {
        self.0.iter().filter(|&&x| x != 0.0).count()
    }

    /// `self / Σ self`; a zero sum is `NumericDegeneracy`.
    pub fn normalised(&self) -> GraphResult<Self> {
        let sum = self.sum();
        if sum == 0.0 || !sum.is_finite() {
            return Err(GraphError::NumericDegeneracy(format!(
                "cannot normalise state vector with sum {sum}"
            )));
        }
        Ok(Self(self.0.iter().map(|&x| x / sum).collect()))
    }

    /// Max-plus proportionality: `self = other ⊗ c` for a scalar `c`.
    ///
    /// Holds when every difference `self[i] − other[i]` equals the first
    /// within `tol`; returns that first difference as `c`. Swapping the
    /// operands negates `c`. Empty vectors are proportional with `c = 0`.
    pub fn proportionality(&self, other: &StateVector, tol: f64) -> GraphResult<Option<f64>> {
        if self.len() != other.len() {
            return Err(GraphError::DimensionMismatch {
                left: (self.len(), 1),
                right: (other.len(), 1),
            });
        }
        let mut pairs = self.0.iter().zip(&other.0).map(|(&a, &b)| a - b);
        let first = match pairs.next() {
            Some(d) => d,
            None => return Ok(Some(0.0)),
        };
        if pairs.all(|d| (d - first).abs() <= tol) {
            Ok(Some(first))
        } else {
            Ok(None)
        }
    }
}

impl From<Vec<f64>> for StateVector {
    fn from(v: Vec<f64>) -> Self {
        Self(v)
    }
}

impl From<StateVector> for Matrix {
    fn from(v: StateVector) -> Self {
        Matrix {
            rows: v.0.len(),
            cols: 1,
            data: v.0,
        }
    }
}

impl TryFrom<Matrix> for StateVector {
    type Error = GraphError;

    fn try_from(m: Matrix) -> GraphResult<Self> {
        if m.cols != 1 {
            return Err(GraphError::DimensionMismatch {
                left: m.shape(),
                right: (m.rows, 1),
            });
        }
        Ok(Self(m.data))
    }
}

impl Index<usize> for StateVector {
    type Output = f64;

    #[inline]
    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

/// Transposed row in parentheses: `(1 0 0.500)`.
impl fmt::Display for StateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<String> = self.0.iter().map(|&x| display_number(x)).collect();
        write!(f, "({})", cells.join(" "))
    }
}
