// ─────────────────────────────────────────────────────────────────────
// GraphStable — Engine Configuration
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};

/// Runtime configuration for stabilization runs.
///
/// Every run is bounded by `max_iterations` and `timeout_ms`; the
/// stopping rules themselves carry no termination guarantee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of committed advances per track.
    /// Default: 10 000.
    pub max_iterations: usize,

    /// Wall-clock budget per track in milliseconds.
    /// Default: 30 000.
    pub timeout_ms: u64,

    /// Absolute tolerance on max-plus elementwise differences.
    /// Default: 1e-5.
    pub proportionality_tolerance: f64,

    /// Number of uncommitted max-plus products in the look-ahead.
    /// Default: 2.
    pub maxplus_lookahead: usize,

    /// Arc count above which a run is logged as potentially slow.
    /// Default: 100.
    pub large_graph_notice: usize,

    /// Arc count above which a run is logged as potentially unbounded.
    /// Default: 500.
    pub large_graph_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            timeout_ms: 30_000,
            proportionality_tolerance: 1e-5,
            maxplus_lookahead: 2,
            large_graph_notice: 100,
            large_graph_limit: 500,
        }
    }
}

impl EngineConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> GraphResult<()> {
        if self.max_iterations < 1 {
            return Err(GraphError::Config(format!(
                "max_iterations must be >= 1, got {}",
                self.max_iterations
            )));
        }
        if self.timeout_ms == 0 {
            return Err(GraphError::Config("timeout_ms must be > 0".to_string()));
        }
        if !self.proportionality_tolerance.is_finite() || self.proportionality_tolerance <= 0.0 {
            return Err(GraphError::Config(format!(
                "proportionality_tolerance must be finite and > 0, got {}",
                self.proportionality_tolerance
            )));
        }
        if self.maxplus_lookahead < 1 {
            return Err(GraphError::Config(format!(
                "maxplus_lookahead must be >= 1, got {}",
                self.maxplus_lookahead
            )));
        }
        if self.large_graph_notice > self.large_graph_limit {
            return Err(GraphError::Config(format!(
                "large_graph_notice ({}) must not exceed large_graph_limit ({})",
                self.large_graph_notice, self.large_graph_limit
            )));
        }
        Ok(())
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> GraphResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| GraphError::Config(format!("JSON parse error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let cfg = EngineConfig {
            max_iterations: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(GraphError::Config(_))));
    }

    #[test]
    fn test_nan_tolerance_rejected() {
        let cfg = EngineConfig {
            proportionality_tolerance: f64::NAN,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_notice_above_limit_rejected() {
        let cfg = EngineConfig {
            large_graph_notice: 600,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let cfg = EngineConfig::from_json(r#"{"max_iterations": 50}"#).unwrap();
        assert_eq!(cfg.max_iterations, 50);
        assert_eq!(cfg.timeout_ms, 30_000);
        assert!((cfg.proportionality_tolerance - 1e-5).abs() < 1e-18);
    }

    #[test]
    fn test_from_json_malformed() {
        assert!(matches!(
            EngineConfig::from_json("{not json"),
            Err(GraphError::Config(_))
        ));
    }
}
