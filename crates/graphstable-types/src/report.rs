// ─────────────────────────────────────────────────────────────────────
// GraphStable — Track, Mode and Report Types
// ─────────────────────────────────────────────────────────────────────

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which transition matrix a computation runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    /// Binary arc adjacency matrix M.
    Binary,
    /// Row-stochastic matrix P.
    Stochastic,
    /// Scattering matrix S.
    Scattering,
}

impl Track {
    pub const ALL: [Track; 3] = [Track::Binary, Track::Stochastic, Track::Scattering];

    pub fn as_str(&self) -> &'static str {
        match self {
            Track::Binary => "binary",
            Track::Stochastic => "stochastic",
            Track::Scattering => "scattering",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "binary" | "m" => Some(Track::Binary),
            "stochastic" | "p" => Some(Track::Stochastic),
            "scattering" | "s" => Some(Track::Scattering),
            _ => None,
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semiring a computation is carried out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Ordinary (+, ×).
    Ordinary,
    /// Tropical (max, +).
    MaxPlus,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Ordinary => "ordinary",
            Mode::MaxPlus => "max-plus",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ordinary" | "plus-mult" | "plus_mult" => Some(Mode::Ordinary),
            "max-plus" | "max_plus" | "maxplus" | "tropical" => Some(Mode::MaxPlus),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one successful stabilization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilizationReport {
    pub track: Track,
    pub mode: Mode,
    /// Iteration count at which the stopping rule fired (starts at 1,
    /// the smallest reported value is 2).
    pub iterations: usize,
    /// Max-plus growth coefficient; `None` in ordinary mode.
    pub coefficient: Option<f64>,
    /// Wall-clock duration of the run.
    pub elapsed_ms: f64,
}

/// Per-track result of a full run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrackOutcome {
    Stabilized(StabilizationReport),
    Skipped { reason: String },
}

impl TrackOutcome {
    pub fn report(&self) -> Option<&StabilizationReport> {
        match self {
            TrackOutcome::Stabilized(r) => Some(r),
            TrackOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TrackOutcome::Skipped { .. })
    }
}

/// Results of running every applicable track in one mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub mode: Mode,
    pub binary: TrackOutcome,
    pub stochastic: TrackOutcome,
    pub scattering: TrackOutcome,
}

impl RunSummary {
    pub fn outcome(&self, track: Track) -> &TrackOutcome {
        match track {
            Track::Binary => &self.binary,
            Track::Stochastic => &self.stochastic,
            Track::Scattering => &self.scattering,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_parse_roundtrip() {
        for track in Track::ALL {
            assert_eq!(Track::parse(track.as_str()), Some(track));
        }
        assert_eq!(Track::parse("P"), Some(Track::Stochastic));
        assert_eq!(Track::parse("laplacian"), None);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(Mode::parse("max-plus"), Some(Mode::MaxPlus));
        assert_eq!(Mode::parse("Tropical"), Some(Mode::MaxPlus));
        assert_eq!(Mode::parse("ordinary"), Some(Mode::Ordinary));
        assert_eq!(Mode::parse("min-plus"), None);
    }

    #[test]
    fn test_outcome_serialises_with_status_tag() {
        let outcome = TrackOutcome::Skipped {
            reason: "not clean".into(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"status\":\"skipped\""));
        assert!(outcome.is_skipped());
        assert!(outcome.report().is_none());
    }
}
