// ─────────────────────────────────────────────────────────────────────
// GraphStable — Transition Matrix Builder
// ─────────────────────────────────────────────────────────────────────
//! Binary arc adjacency M, row-stochastic P and scattering S.
//!
//!   M[i,j] = 1  iff head(arc_i) == tail(arc_j)
//!   P[i,j] = M[i,j] / d_i                       (d_i = Σ_j M[i,j])
//!   S[i,j] = M[i,j]                             if d_i == 1
//!          = 1 − 2/d_i  (reflection)            if j reverses i
//!          = 2/d_i      (transmission)          otherwise, M[i,j] ≠ 0
//!
//! "j reverses i" means same provenance, i ≠ j and
//! source(arc_i) == target(arc_j). S is only built for clean graphs:
//! no row of M may sum to exactly 2.

use graphstable_types::{GraphError, GraphResult, Track};

use crate::expander::ArcGraph;
use crate::linalg::{Matrix, StateVector};
use crate::topology::VertexId;

/// Binary matrix: arc `j` can immediately follow arc `i`.
pub fn binary_matrix(arcs: &ArcGraph) -> Matrix {
    let n = arcs.len();

    // Arcs grouped by tail vertex, in arc order.
    let mut by_tail: Vec<Vec<usize>> = vec![Vec::new(); arcs.vertex_count()];
    for (j, arc) in arcs.arcs().iter().enumerate() {
        by_tail[arc.source.index()].push(j);
    }

    let mut m = Matrix::square(n);
    for (i, arc) in arcs.arcs().iter().enumerate() {
        for &j in &by_tail[arc.target.index()] {
            m[(i, j)] = 1.0;
        }
    }
    m
}

/// Row-normalised binary matrix.
pub fn stochastic_matrix(binary: &Matrix) -> GraphResult<Matrix> {
    let n = binary.rows();
    let mut p = Matrix::zeros(n, binary.cols());
    for i in 0..n {
        let d = nonzero_row_sum(binary, i, Track::Stochastic)?;
        for (j, &x) in binary.row(i).iter().enumerate() {
            p[(i, j)] = x / d;
        }
    }
    Ok(p)
}

/// First row of `binary` whose sum is exactly 2, if any.
pub fn first_unclean_row(binary: &Matrix) -> Option<usize> {
    (0..binary.rows()).find(|&i| binary.row_sum(i) == 2.0)
}

/// True if no arc has out-degree exactly 2 in arc space.
pub fn is_clean(binary: &Matrix) -> bool {
    first_unclean_row(binary).is_none()
}

/// Scattering matrix. `NotClean` if any row of `binary` sums to 2.
pub fn scattering_matrix(binary: &Matrix, arcs: &ArcGraph) -> GraphResult<Matrix> {
    if let Some(row) = first_unclean_row(binary) {
        return Err(GraphError::NotClean { row });
    }
    if binary.rows() != arcs.len() || !binary.is_square() {
        return Err(GraphError::DimensionMismatch {
            left: binary.shape(),
            right: (arcs.len(), arcs.len()),
        });
    }

    let n = binary.rows();
    let mut s = Matrix::square(n);
    for i in 0..n {
        let d = nonzero_row_sum(binary, i, Track::Scattering)?;
        if d == 1.0 {
            for (j, &x) in binary.row(i).iter().enumerate() {
                s[(i, j)] = x;
            }
            continue;
        }

        let arc_i = &arcs.arcs()[i];
        for (j, &x) in binary.row(i).iter().enumerate() {
            if x == 0.0 {
                continue;
            }
            let arc_j = &arcs.arcs()[j];
            let reverses =
                i != j && arc_i.provenance == arc_j.provenance && arc_i.source == arc_j.target;
            s[(i, j)] = if reverses { 1.0 - 2.0 * x / d } else { 2.0 * x / d };
        }
    }
    Ok(s)
}

fn nonzero_row_sum(m: &Matrix, i: usize, track: Track) -> GraphResult<f64> {
    let d = m.row_sum(i);
    if d == 0.0 {
        return Err(GraphError::NumericDegeneracy(format!(
            "{track} matrix: arc {i} has no successor (zero row sum)"
        )));
    }
    Ok(d)
}

/// Indicator vector over arcs leaving `start`.
pub fn indicator_vector(arcs: &ArcGraph, start: VertexId) -> StateVector {
    let mut v = StateVector::zeros(arcs.len());
    for i in arcs.arcs_leaving(start) {
        v.set(i, 1.0);
    }
    v
}

/// The three transition matrices of one arc graph.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrices {
    pub binary: Matrix,
    pub stochastic: Matrix,
    /// `None` when the graph is not clean.
    pub scattering: Option<Matrix>,
    /// First disqualifying row when `scattering` is `None`.
    pub unclean_row: Option<usize>,
}

impl TransitionMatrices {
    pub fn build(arcs: &ArcGraph) -> GraphResult<Self> {
        let binary = binary_matrix(arcs);
        let stochastic = stochastic_matrix(&binary)?;
        let (scattering, unclean_row) = match scattering_matrix(&binary, arcs) {
            Ok(s) => (Some(s), None),
            Err(GraphError::NotClean { row }) => {
                log::info!("arc {row} has out-degree 2: scattering matrix not built");
                (None, Some(row))
            }
            Err(e) => return Err(e),
        };
        Ok(Self {
            binary,
            stochastic,
            scattering,
            unclean_row,
        })
    }

    pub fn is_clean(&self) -> bool {
        self.scattering.is_some()
    }

    /// Matrix of `track`; `NotClean` for a skipped scattering track.
    pub fn get(&self, track: Track) -> GraphResult<&Matrix> {
        match track {
            Track::Binary => Ok(&self.binary),
            Track::Stochastic => Ok(&self.stochastic),
            Track::Scattering => self.scattering.as_ref().ok_or(GraphError::NotClean {
                row: self.unclean_row.unwrap_or_default(),
            }),
        }
    }
}
