// ─────────────────────────────────────────────────────────────────────
// GraphStable — Stabilization Detector
// ─────────────────────────────────────────────────────────────────────
//! Repeated multiplication with a per-track stopping rule.
//!
//! The loop is do-while: advance (`v ← M·v`, `count += 1`), notify,
//! then test. `count` starts at 1, so the smallest reported value is 2.
//!
//! Stopping rules:
//!   - binary, max-plus: look ahead `maxplus_lookahead` products and
//!     stop when the look-ahead is max-plus proportional to `v`; the
//!     common difference is the growth coefficient.
//!   - any track, ordinary: look ahead `2 × max edge weight` products and
//!     stop when the look-ahead has as many non-zero components as `v`.
//!
//! Neither rule is guaranteed to fire, so every run is bounded by a
//! `Budget`. Cancellation is polled between advances only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use graphstable_core::semiring;
use graphstable_core::{Matrix, StateVector};
use graphstable_types::{EngineConfig, GraphError, GraphResult, Mode, StabilizationReport, Track};

/// Shared flag checked between two advances.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Iteration and wall-clock limits of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Budget {
    pub max_iterations: usize,
    pub timeout: Duration,
}

impl Budget {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

/// When a run counts as stabilized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoppingRule {
    /// Max-plus: look-ahead proportional to the current vector.
    Proportional { lookahead: usize, tolerance: f64 },
    /// Ordinary: look-ahead support size equals the current one.
    Support { lookahead: usize },
}

impl StoppingRule {
    /// Rule for `track` in `mode`. Max-plus is only defined on the
    /// binary matrix.
    pub fn for_track(
        track: Track,
        mode: Mode,
        max_edge_weight: u32,
        config: &EngineConfig,
    ) -> GraphResult<Self> {
        match (track, mode) {
            (Track::Binary, Mode::MaxPlus) => Ok(StoppingRule::Proportional {
                lookahead: config.maxplus_lookahead,
                tolerance: config.proportionality_tolerance,
            }),
            (_, Mode::MaxPlus) => Err(GraphError::UnsupportedMode { track, mode }),
            (_, Mode::Ordinary) => Ok(StoppingRule::Support {
                lookahead: 2 * max_edge_weight as usize,
            }),
        }
    }

    fn mode(&self) -> Mode {
        match self {
            StoppingRule::Proportional { .. } => Mode::MaxPlus,
            StoppingRule::Support { .. } => Mode::Ordinary,
        }
    }
}

/// Result of testing the current vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Continue,
    Stabilized { coefficient: Option<f64> },
}

/// Stabilization state machine over one matrix.
pub struct StabilizationDetector<'m> {
    track: Track,
    matrix: &'m Matrix,
    rule: StoppingRule,
    count: usize,
}

impl<'m> StabilizationDetector<'m> {
    pub fn new(track: Track, matrix: &'m Matrix, rule: StoppingRule) -> Self {
        Self {
            track,
            matrix,
            rule,
            count: 1,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mode(&self) -> Mode {
        self.rule.mode()
    }

    /// Commit one multiplication to `v`.
    pub fn advance(&mut self, v: &mut StateVector) -> GraphResult<()> {
        *v = semiring::apply(self.rule.mode(), self.matrix, v)?;
        self.count += 1;
        Ok(())
    }

    /// Test `v` against the stopping rule without modifying it.
    pub fn verdict(&self, v: &StateVector) -> GraphResult<Verdict> {
        match self.rule {
            StoppingRule::Proportional {
                lookahead,
                tolerance,
            } => {
                let ahead = semiring::look_ahead(Mode::MaxPlus, self.matrix, v, lookahead)?;
                Ok(match ahead.proportionality(v, tolerance)? {
                    Some(c) => Verdict::Stabilized {
                        coefficient: Some(c),
                    },
                    None => Verdict::Continue,
                })
            }
            StoppingRule::Support { lookahead } => {
                let ahead = semiring::look_ahead(Mode::Ordinary, self.matrix, v, lookahead)?;
                Ok(if ahead.nonzero_count() == v.nonzero_count() {
                    Verdict::Stabilized { coefficient: None }
                } else {
                    Verdict::Continue
                })
            }
        }
    }

    /// Advance until the stopping rule fires or the budget runs out.
    ///
    /// `on_advance` is called synchronously after every committed
    /// advance with the new count and a shared view of `v`.
    pub fn run<F>(
        &mut self,
        v: &mut StateVector,
        budget: &Budget,
        cancel: Option<&CancelToken>,
        mut on_advance: F,
    ) -> GraphResult<StabilizationReport>
    where
        F: FnMut(usize, &StateVector),
    {
        let start = Instant::now();
        loop {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                log::info!("{} track cancelled at iteration {}", self.track, self.count);
                return Err(GraphError::Cancelled {
                    iterations: self.count,
                });
            }
            if self.count - 1 >= budget.max_iterations || start.elapsed() >= budget.timeout {
                log::error!(
                    "{} track did not stabilize within budget ({} iterations, {:.1} ms)",
                    self.track,
                    self.count,
                    start.elapsed().as_secs_f64() * 1000.0
                );
                return Err(GraphError::NonConvergent {
                    track: self.track,
                    iterations: self.count,
                });
            }

            self.advance(v)?;
            log::debug!(
                "{} track advanced to iteration {} (support {})",
                self.track,
                self.count,
                v.nonzero_count()
            );
            on_advance(self.count, v);

            if let Verdict::Stabilized { coefficient } = self.verdict(v)? {
                return Ok(StabilizationReport {
                    track: self.track,
                    mode: self.mode(),
                    iterations: self.count,
                    coefficient,
                    elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
                });
            }
        }
    }
}
