// ─────────────────────────────────────────────────────────────────────
// GraphStable — Stabilization Engine
// (C) 2026 The GraphStable Contributors.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Stabilization detector, observer contract, graph orchestrator and
//! persisted state.
//!
//! # Run Invariants
//!
//! 1. **Every run is bounded**: `max_iterations` and `timeout_ms` from
//!    `EngineConfig` cap each track. Exhaustion is `NonConvergent` with
//!    the count reached, never a silent result.
//!
//! 2. **Cancellation is cooperative**: the `CancelToken` (`AtomicBool`,
//!    `SeqCst`) is read between advances only. A half-advanced vector is
//!    never observable.
//!
//! 3. **Observers cannot break a run**: callbacks receive a shared borrow
//!    of the current vector. Panics are caught via `catch_unwind`, logged,
//!    and the run continues.
//!
//! 4. **Derived state is never stale**: every orchestrator mutator drops
//!    the arc graph, matrices and vectors; the next computation rebuilds.

pub mod graph;
pub mod observer;
pub mod persist;
pub mod stabilization;

pub use graph::Graph;
pub use observer::{
    AdvanceCallback, AdvanceNotice, ObserverRegistry, SubscriptionId, VectorAdvanced,
};
pub use persist::PersistedGraph;
pub use stabilization::{Budget, CancelToken, StabilizationDetector, StoppingRule, Verdict};
