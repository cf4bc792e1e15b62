// ─────────────────────────────────────────────────────────────────────
// GraphStable — Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

use crate::report::{Mode, Track};

/// Root error type for all GraphStable failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Graph is disconnected, has too few edges, or references
    /// vertices/edges that do not exist.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// Edge weight must be a positive integer.
    #[error("degenerate weight: {weight} (edge weights must be >= 1)")]
    DegenerateWeight { weight: i64 },

    /// Multiply with incompatible shapes (left columns != right rows).
    #[error("dimension mismatch: {left:?} x {right:?}")]
    DimensionMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    /// Zero divisor while normalising (row sum or vector sum).
    #[error("numeric degeneracy: {0}")]
    NumericDegeneracy(String),

    /// Scattering track requested on a graph with an out-degree-2 arc.
    /// Recoverable: the remaining tracks still run.
    #[error("graph is not clean: arc {row} has out-degree 2, scattering track skipped")]
    NotClean { row: usize },

    /// Stabilization loop exhausted its iteration or time budget.
    #[error("{track} track did not converge after {iterations} iterations")]
    NonConvergent { track: Track, iterations: usize },

    /// Semiring not defined for the requested track.
    #[error("{mode} mode is only supported on the binary matrix, not {track}")]
    UnsupportedMode { track: Track, mode: Mode },

    /// Cancellation token fired between two advances.
    #[error("stabilization cancelled after {iterations} iterations")]
    Cancelled { iterations: usize },

    /// Matrices or state vectors requested before `initialize()`.
    #[error("graph is not initialized; call initialize() first")]
    NotInitialized,

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Persisted graph could not be read or written.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl GraphError {
    /// Validation failures raised before any matrix work begins.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GraphError::InvalidTopology(_) | GraphError::DegenerateWeight { .. }
        )
    }

    /// Conditions the caller can recover from by skipping a track or
    /// retrying with a larger budget.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GraphError::NotClean { .. }
                | GraphError::NonConvergent { .. }
                | GraphError::Cancelled { .. }
        )
    }

    /// Iteration count reached before the run stopped, if any.
    pub fn partial_iterations(&self) -> Option<usize> {
        match self {
            GraphError::NonConvergent { iterations, .. } | GraphError::Cancelled { iterations } => {
                Some(*iterations)
            }
            _ => None,
        }
    }
}

pub type GraphResult<T> = Result<T, GraphError>;
