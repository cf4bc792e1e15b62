// ─────────────────────────────────────────────────────────────────────
// GraphStable — Engine Types
// (C) 2026 The GraphStable Contributors.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, configuration, and error hierarchy for the
//! GraphStable arc-expansion and stabilization engine.

pub mod config;
pub mod error;
pub mod report;

pub use config::EngineConfig;
pub use error::{GraphError, GraphResult};
pub use report::{Mode, RunSummary, StabilizationReport, Track, TrackOutcome};
