// ─────────────────────────────────────────────────────────────────────
// GraphStable — PyO3 FFI Bindings
// (C) 2026 The GraphStable Contributors.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
// Note: #[deny(unsafe_code)] not applied — PyO3 proc macros generate
// unsafe blocks internally. All hand-written code in this crate is safe.
//! Python-callable wrappers around the GraphStable engine.
//!
//! Exposes `Graph`, `EngineConfig` and `CancelToken` to Python via PyO3.
//!
//! # FFI Safety
//!
//! - GIL acquired via `Python::with_gil` before every Python callback.
//! - A raising observer is logged and skipped; the run continues.
//! - Every `GraphError` surfaces as `ValueError` with its message.
//! - All config validated before storage (`EngineConfig::validate()`).
//!
//! Usage from Python:
//! ```python
//! from graphstable import Graph
//!
//! g = Graph()
//! hub = g.add_vertex()
//! for _ in range(3):
//!     g.add_edge(hub, g.add_vertex(), 1)
//! g.subscribe(lambda track, i, v: print(track, i, v))
//! print(g.run_all("ordinary"))
//! ```

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use graphstable_core::{BracketStyle, VertexId};
use graphstable_engine::{CancelToken, Graph, SubscriptionId};
use graphstable_types::{
    EngineConfig, GraphError, Mode, StabilizationReport, Track, TrackOutcome,
};

fn to_py(e: GraphError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn parse_track(name: &str) -> PyResult<Track> {
    Track::parse(name).ok_or_else(|| {
        PyValueError::new_err(format!(
            "unknown track '{name}' (expected binary, stochastic or scattering)"
        ))
    })
}

fn parse_mode(name: &str) -> PyResult<Mode> {
    Mode::parse(name).ok_or_else(|| {
        PyValueError::new_err(format!("unknown mode '{name}' (expected ordinary or max-plus)"))
    })
}

fn report_dict<'py>(py: Python<'py>, report: &StabilizationReport) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("status", "stabilized")?;
    dict.set_item("track", report.track.as_str())?;
    dict.set_item("mode", report.mode.as_str())?;
    dict.set_item("iterations", report.iterations)?;
    dict.set_item("coefficient", report.coefficient)?;
    dict.set_item("elapsed_ms", report.elapsed_ms)?;
    Ok(dict)
}

fn outcome_dict<'py>(py: Python<'py>, outcome: &TrackOutcome) -> PyResult<Bound<'py, PyDict>> {
    match outcome {
        TrackOutcome::Stabilized(report) => report_dict(py, report),
        TrackOutcome::Skipped { reason } => {
            let dict = PyDict::new(py);
            dict.set_item("status", "skipped")?;
            dict.set_item("reason", reason)?;
            Ok(dict)
        }
    }
}

// ─── PyEngineConfig ─────────────────────────────────────────────────

/// Python-visible engine configuration.
#[pyclass(name = "EngineConfig")]
#[derive(Clone)]
struct PyEngineConfig {
    inner: EngineConfig,
}

#[pymethods]
impl PyEngineConfig {
    #[new]
    #[pyo3(signature = (
        max_iterations = 10_000,
        timeout_ms = 30_000,
        proportionality_tolerance = 1e-5,
        maxplus_lookahead = 2,
        large_graph_notice = 100,
        large_graph_limit = 500,
    ))]
    fn new(
        max_iterations: usize,
        timeout_ms: u64,
        proportionality_tolerance: f64,
        maxplus_lookahead: usize,
        large_graph_notice: usize,
        large_graph_limit: usize,
    ) -> PyResult<Self> {
        let config = EngineConfig {
            max_iterations,
            timeout_ms,
            proportionality_tolerance,
            maxplus_lookahead,
            large_graph_notice,
            large_graph_limit,
        };
        config.validate().map_err(to_py)?;
        Ok(Self { inner: config })
    }

    /// Construct from JSON string.
    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        let config = EngineConfig::from_json(json).map_err(to_py)?;
        config.validate().map_err(to_py)?;
        Ok(Self { inner: config })
    }

    #[getter]
    fn max_iterations(&self) -> usize {
        self.inner.max_iterations
    }

    #[getter]
    fn timeout_ms(&self) -> u64 {
        self.inner.timeout_ms
    }

    fn __repr__(&self) -> String {
        format!(
            "EngineConfig(max_iterations={}, timeout_ms={}, tolerance={})",
            self.inner.max_iterations, self.inner.timeout_ms, self.inner.proportionality_tolerance
        )
    }
}

// ─── PyCancelToken ──────────────────────────────────────────────────

/// Cancellation flag shared with a `Graph`; safe to trip from an observer.
#[pyclass(name = "CancelToken")]
#[derive(Clone)]
struct PyCancelToken {
    inner: CancelToken,
}

#[pymethods]
impl PyCancelToken {
    fn cancel(&self) {
        self.inner.cancel();
    }

    fn reset(&self) {
        self.inner.reset();
    }

    #[getter]
    fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }
}

// ─── PyGraph ────────────────────────────────────────────────────────

/// Weighted undirected graph with stabilization-time analysis.
#[pyclass(name = "Graph")]
struct PyGraph {
    inner: Graph,
}

#[pymethods]
impl PyGraph {
    #[new]
    #[pyo3(signature = (config = None))]
    fn new(config: Option<PyEngineConfig>) -> PyResult<Self> {
        let config = config.map(|c| c.inner).unwrap_or_default();
        Ok(Self {
            inner: Graph::with_config(config).map_err(to_py)?,
        })
    }

    // Topology

    #[pyo3(signature = (label = None))]
    fn add_vertex(&mut self, label: Option<u32>) -> u32 {
        match label {
            Some(l) => self.inner.add_labelled_vertex(l).0,
            None => self.inner.add_vertex().0,
        }
    }

    #[pyo3(signature = (source, target, weight = 1))]
    fn add_edge(&mut self, source: u32, target: u32, weight: i64) -> PyResult<usize> {
        self.inner
            .add_edge(VertexId(source), VertexId(target), weight)
            .map_err(to_py)
    }

    fn set_weight(&mut self, edge: usize, weight: i64) -> PyResult<()> {
        self.inner.set_weight(edge, weight).map_err(to_py)
    }

    fn select_start(&mut self, vertex: u32) -> PyResult<()> {
        self.inner.select_start(VertexId(vertex)).map_err(to_py)
    }

    #[getter]
    fn starting_vertex(&self) -> Option<u32> {
        self.inner.starting_vertex().map(|v| v.0)
    }

    #[getter]
    fn vertex_count(&self) -> usize {
        self.inner.topology().vertex_count()
    }

    #[getter]
    fn edge_count(&self) -> usize {
        self.inner.topology().edge_count()
    }

    /// List of `(source, target, weight)` tuples.
    fn edges(&self) -> Vec<(u32, u32, u32)> {
        self.inner
            .topology()
            .edges()
            .iter()
            .map(|e| (e.source.0, e.target.0, e.weight))
            .collect()
    }

    fn are_neighbours(&self, a: u32, b: u32) -> bool {
        self.inner.topology().are_neighbours(VertexId(a), VertexId(b))
    }

    fn neighbours(&self, vertex: u32) -> Vec<u32> {
        self.inner
            .topology()
            .neighbours(VertexId(vertex))
            .into_iter()
            .map(|v| v.0)
            .collect()
    }

    fn is_connected(&self) -> bool {
        self.inner.topology().is_connected()
    }

    fn max_edge_weight(&self) -> u32 {
        self.inner.topology().max_edge_weight()
    }

    // Lifecycle

    fn initialize(&mut self) -> PyResult<()> {
        self.inner.initialize().map_err(to_py)
    }

    fn recompute(&mut self) -> PyResult<()> {
        self.inner.recompute().map_err(to_py)
    }

    fn invalidate(&mut self) {
        self.inner.invalidate();
    }

    #[getter]
    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    fn is_clean(&self) -> PyResult<bool> {
        self.inner.is_clean().map_err(to_py)
    }

    fn arc_count(&self) -> PyResult<usize> {
        Ok(self.inner.arc_graph().map_err(to_py)?.len())
    }

    /// Split arcs as `(source, target, provenance)` tuples.
    fn arcs(&self) -> PyResult<Vec<(u32, u32, Option<usize>)>> {
        Ok(self
            .inner
            .arc_graph()
            .map_err(to_py)?
            .arcs()
            .iter()
            .map(|a| (a.source.0, a.target.0, a.provenance))
            .collect())
    }

    // Stabilization

    /// Run one track; returns a dict with `iterations` and `coefficient`.
    #[pyo3(signature = (track = "binary", mode = "ordinary"))]
    fn compute_stabilization<'py>(
        &mut self,
        py: Python<'py>,
        track: &str,
        mode: &str,
    ) -> PyResult<Bound<'py, PyDict>> {
        let report = self
            .inner
            .compute_stabilization(parse_track(track)?, parse_mode(mode)?)
            .map_err(to_py)?;
        report_dict(py, &report)
    }

    /// Run every applicable track; returns `{track: outcome}`.
    #[pyo3(signature = (mode = "ordinary"))]
    fn run_all<'py>(&mut self, py: Python<'py>, mode: &str) -> PyResult<Bound<'py, PyDict>> {
        let summary = self.inner.run_all(parse_mode(mode)?).map_err(to_py)?;
        let dict = PyDict::new(py);
        for track in Track::ALL {
            dict.set_item(track.as_str(), outcome_dict(py, summary.outcome(track))?)?;
        }
        Ok(dict)
    }

    fn cancel_token(&self) -> PyCancelToken {
        PyCancelToken {
            inner: self.inner.cancel_token(),
        }
    }

    // Matrices and vectors

    fn matrix(&self, track: &str) -> PyResult<Vec<Vec<f64>>> {
        Ok(self.inner.matrix(parse_track(track)?).map_err(to_py)?.to_rows())
    }

    fn state_vector(&self, track: &str) -> PyResult<Vec<f64>> {
        Ok(self
            .inner
            .state_vector(parse_track(track)?)
            .map_err(to_py)?
            .as_slice()
            .to_vec())
    }

    fn initial_vector(&self, track: &str) -> PyResult<Vec<f64>> {
        Ok(self
            .inner
            .initial_vector(parse_track(track)?)
            .map_err(to_py)?
            .as_slice()
            .to_vec())
    }

    /// Nested-bracket export; `curly=True` gives `{{..},{..}}`.
    #[pyo3(signature = (track, curly = false))]
    fn export_matrix(&self, track: &str, curly: bool) -> PyResult<String> {
        let style = if curly {
            BracketStyle::Curly
        } else {
            BracketStyle::Square
        };
        self.inner
            .export_matrix(parse_track(track)?, style)
            .map_err(to_py)
    }

    // Persistence

    fn to_json(&self) -> PyResult<String> {
        self.inner.to_json().map_err(to_py)
    }

    #[staticmethod]
    #[pyo3(signature = (json, config = None))]
    fn from_json(json: &str, config: Option<PyEngineConfig>) -> PyResult<Self> {
        let config = config.map(|c| c.inner).unwrap_or_default();
        Ok(Self {
            inner: Graph::from_json(json, config).map_err(to_py)?,
        })
    }

    fn save(&self, path: &str) -> PyResult<()> {
        self.inner.save(path).map_err(to_py)
    }

    #[staticmethod]
    #[pyo3(signature = (path, config = None))]
    fn load(path: &str, config: Option<PyEngineConfig>) -> PyResult<Self> {
        let config = config.map(|c| c.inner).unwrap_or_default();
        Ok(Self {
            inner: Graph::load(path, config).map_err(to_py)?,
        })
    }

    // Observers

    /// Register `callback(track: str, iteration: int, vector: list[float])`,
    /// called after every advance. Returns a subscription id.
    fn subscribe(&mut self, callback: PyObject) -> u64 {
        let id = self.inner.subscribe(Box::new(move |event| {
            let vector = event.current().as_slice().to_vec();
            Python::with_gil(|py| {
                let args = (event.track.as_str(), event.iteration, vector);
                if let Err(err) = callback.call1(py, args) {
                    log::error!(
                        "Python observer raised at {} iteration {}: {err}",
                        event.track,
                        event.iteration
                    );
                }
            });
        }));
        id.0
    }

    fn unsubscribe(&mut self, id: u64) -> bool {
        self.inner.unsubscribe(SubscriptionId(id))
    }

    fn __repr__(&self) -> String {
        let t = self.inner.topology();
        format!(
            "Graph(vertices={}, edges={}, ready={})",
            t.vertex_count(),
            t.edge_count(),
            self.inner.is_ready()
        )
    }
}

#[pymodule]
fn graphstable(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyEngineConfig>()?;
    m.add_class::<PyCancelToken>()?;
    m.add_class::<PyGraph>()?;
    Ok(())
}
