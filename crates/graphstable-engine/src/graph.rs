// ─────────────────────────────────────────────────────────────────────
// GraphStable — Graph Orchestrator
// ─────────────────────────────────────────────────────────────────────
//! Owns the topology and everything derived from it.
//!
//! Lifecycle:
//!   1. Build the topology (`add_vertex`, `add_edge`, `set_weight`,
//!      `select_start`). Every mutator drops derived state.
//!   2. `initialize()`: validate, expand to arcs, build M/P/S and the
//!      initial vector of each track.
//!   3. `compute_stabilization(track, mode)` or `run_all(mode)`. Each run
//!      restarts from the track's initial vector and leaves the advanced
//!      vector readable through `state_vector(track)`.

use std::sync::mpsc::Receiver;

use graphstable_core::builder::indicator_vector;
use graphstable_core::{
    ArcGraph, BracketStyle, Matrix, StateVector, Topology, TransitionMatrices, VertexId,
};
use graphstable_types::{
    EngineConfig, GraphError, GraphResult, Mode, RunSummary, StabilizationReport, Track,
    TrackOutcome,
};

use crate::observer::{
    AdvanceCallback, AdvanceNotice, ObserverRegistry, SubscriptionId, VectorAdvanced,
};
use crate::stabilization::{Budget, CancelToken, StabilizationDetector, StoppingRule};

/// One state vector per track. Scattering is absent on unclean graphs.
#[derive(Debug, Clone, PartialEq)]
struct TrackVectors {
    binary: StateVector,
    stochastic: StateVector,
    scattering: Option<StateVector>,
}

impl TrackVectors {
    fn get(&self, track: Track) -> Option<&StateVector> {
        match track {
            Track::Binary => Some(&self.binary),
            Track::Stochastic => Some(&self.stochastic),
            Track::Scattering => self.scattering.as_ref(),
        }
    }

    fn get_mut(&mut self, track: Track) -> Option<&mut StateVector> {
        match track {
            Track::Binary => Some(&mut self.binary),
            Track::Stochastic => Some(&mut self.stochastic),
            Track::Scattering => self.scattering.as_mut(),
        }
    }
}

/// Everything `initialize()` produces.
struct Derived {
    arcs: ArcGraph,
    matrices: TransitionMatrices,
    initial: TrackVectors,
    current: TrackVectors,
}

/// Graph orchestrator.
pub struct Graph {
    topology: Topology,
    starting: Option<VertexId>,
    config: EngineConfig,
    supplied_arcs: Option<ArcGraph>,
    derived: Option<Derived>,
    observers: ObserverRegistry,
    cancel: CancelToken,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            topology: Topology::new(),
            starting: None,
            config: EngineConfig::default(),
            supplied_arcs: None,
            derived: None,
            observers: ObserverRegistry::new(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_config(config: EngineConfig) -> GraphResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Wrap an existing topology. Edges are re-checked; `starting`, when
    /// given, must exist.
    pub fn from_topology(
        topology: Topology,
        starting: Option<VertexId>,
        config: EngineConfig,
    ) -> GraphResult<Self> {
        topology.validate_edges()?;
        let mut graph = Self::with_config(config)?;
        graph.topology = topology;
        if let Some(v) = starting {
            graph.select_start(v)?;
        }
        Ok(graph)
    }

    // ── Topology ─────────────────────────────────────────────────────

    pub fn add_vertex(&mut self) -> VertexId {
        self.topology_changed();
        self.topology.add_vertex()
    }

    pub fn add_labelled_vertex(&mut self, label: u32) -> VertexId {
        self.topology_changed();
        self.topology.add_labelled_vertex(label)
    }

    pub fn add_edge(
        &mut self,
        source: VertexId,
        target: VertexId,
        weight: i64,
    ) -> GraphResult<usize> {
        let index = self.topology.add_edge(source, target, weight)?;
        self.topology_changed();
        Ok(index)
    }

    pub fn set_weight(&mut self, edge: usize, weight: i64) -> GraphResult<()> {
        self.topology.set_weight(edge, weight)?;
        self.topology_changed();
        Ok(())
    }

    pub fn select_start(&mut self, vertex: VertexId) -> GraphResult<()> {
        self.topology.require_vertex(vertex)?;
        self.starting = Some(vertex);
        self.invalidate();
        Ok(())
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Direct access to the topology. Derived state is not dropped
    /// automatically; call `invalidate()` after mutating.
    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    pub fn starting_vertex(&self) -> Option<VertexId> {
        self.starting
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) -> GraphResult<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Drop derived state; the next computation re-initializes.
    pub fn invalidate(&mut self) {
        if self.derived.take().is_some() {
            log::debug!("derived state invalidated");
        }
    }

    pub fn is_ready(&self) -> bool {
        self.derived.is_some()
    }

    /// Use `arcs` instead of expanding the topology on `initialize()`.
    /// Cleared by the next topology mutation.
    pub fn supply_arc_graph(&mut self, arcs: ArcGraph) -> GraphResult<()> {
        arcs.check_against(&self.topology)?;
        self.supplied_arcs = Some(arcs);
        self.invalidate();
        Ok(())
    }

    pub fn initialize(&mut self) -> GraphResult<()> {
        self.derived = None;
        self.topology.validate_for_stabilization()?;

        let start = match self.starting {
            Some(v) => {
                self.topology.require_vertex(v)?;
                v
            }
            None => self
                .topology
                .vertices()
                .first()
                .map(|v| v.id)
                .ok_or_else(|| GraphError::InvalidTopology("graph has no vertices".into()))?,
        };

        let arcs = match &self.supplied_arcs {
            Some(arcs) => {
                arcs.check_against(&self.topology)?;
                arcs.clone()
            }
            None => ArcGraph::expand(&self.topology),
        };

        let matrices = TransitionMatrices::build(&arcs)?;
        let indicator = indicator_vector(&arcs, start);
        let initial = TrackVectors {
            stochastic: indicator.normalised()?,
            scattering: matrices.is_clean().then(|| indicator.clone()),
            binary: indicator,
        };

        log::info!(
            "initialized: {} vertices, {} edges, {} arcs, start {}, clean = {}",
            self.topology.vertex_count(),
            self.topology.edge_count(),
            arcs.len(),
            start,
            matrices.is_clean()
        );

        self.starting = Some(start);
        self.derived = Some(Derived {
            arcs,
            matrices,
            current: initial.clone(),
            initial,
        });
        Ok(())
    }

    pub fn recompute(&mut self) -> GraphResult<()> {
        self.invalidate();
        self.initialize()
    }

    // ── Stabilization ────────────────────────────────────────────────

    /// Run one track to stabilization, initializing first if needed.
    pub fn compute_stabilization(
        &mut self,
        track: Track,
        mode: Mode,
    ) -> GraphResult<StabilizationReport> {
        let max_weight = self.topology.max_edge_weight();
        let rule = StoppingRule::for_track(track, mode, max_weight, &self.config)?;
        if self.derived.is_none() {
            self.initialize()?;
        }

        let Graph {
            derived,
            observers,
            config,
            cancel,
            ..
        } = self;
        let Derived {
            arcs,
            matrices,
            initial,
            current,
        } = derived.as_mut().ok_or(GraphError::NotInitialized)?;

        let matrix = matrices.get(track)?;
        let start = initial.get(track).ok_or(GraphError::NotInitialized)?.clone();
        let v = current.get_mut(track).ok_or(GraphError::NotInitialized)?;
        *v = start;

        if arcs.len() > config.large_graph_limit {
            log::warn!(
                "{} arcs exceed {}: the {} track may never stabilize within budget",
                arcs.len(),
                config.large_graph_limit,
                track
            );
        } else if arcs.len() > config.large_graph_notice {
            log::warn!("{} arcs: the {} track may take a while", arcs.len(), track);
        }

        let budget = Budget::from_config(config);
        let mut detector = StabilizationDetector::new(track, matrix, rule);
        let report = detector.run(v, &budget, Some(&*cancel), |iteration, vector| {
            observers.notify(&VectorAdvanced::new(track, iteration, vector));
        })?;

        log::info!(
            "{} track stabilized ({}) after {} iterations in {:.2} ms",
            track,
            mode,
            report.iterations,
            report.elapsed_ms
        );
        Ok(report)
    }

    /// Binary track in `mode`; in ordinary mode also the stochastic track
    /// and, when clean, the scattering track.
    ///
    /// `NotClean` and `NonConvergent` are reported as skipped tracks;
    /// any other error aborts the run.
    pub fn run_all(&mut self, mode: Mode) -> GraphResult<RunSummary> {
        let binary = self.outcome(Track::Binary, mode)?;
        let (stochastic, scattering) = match mode {
            Mode::Ordinary => (
                self.outcome(Track::Stochastic, mode)?,
                self.outcome(Track::Scattering, mode)?,
            ),
            Mode::MaxPlus => {
                let reason = format!("{mode} mode runs on the binary matrix only");
                (
                    TrackOutcome::Skipped {
                        reason: reason.clone(),
                    },
                    TrackOutcome::Skipped { reason },
                )
            }
        };
        Ok(RunSummary {
            mode,
            binary,
            stochastic,
            scattering,
        })
    }

    fn outcome(&mut self, track: Track, mode: Mode) -> GraphResult<TrackOutcome> {
        match self.compute_stabilization(track, mode) {
            Ok(report) => Ok(TrackOutcome::Stabilized(report)),
            Err(e @ (GraphError::NotClean { .. } | GraphError::NonConvergent { .. })) => {
                Ok(TrackOutcome::Skipped {
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    // ── Accessors ────────────────────────────────────────────────────

    fn derived(&self) -> GraphResult<&Derived> {
        self.derived.as_ref().ok_or(GraphError::NotInitialized)
    }

    pub fn arc_graph(&self) -> GraphResult<&ArcGraph> {
        Ok(&self.derived()?.arcs)
    }

    pub fn matrices(&self) -> GraphResult<&TransitionMatrices> {
        Ok(&self.derived()?.matrices)
    }

    pub fn matrix(&self, track: Track) -> GraphResult<&Matrix> {
        self.derived()?.matrices.get(track)
    }

    pub fn is_clean(&self) -> GraphResult<bool> {
        Ok(self.derived()?.matrices.is_clean())
    }

    /// Vector of `track` after the most recent run (the initial vector
    /// if the track has not run since `initialize()`).
    pub fn state_vector(&self, track: Track) -> GraphResult<&StateVector> {
        let d = self.derived()?;
        d.current.get(track).ok_or_else(|| not_clean(&d.matrices))
    }

    pub fn initial_vector(&self, track: Track) -> GraphResult<&StateVector> {
        let d = self.derived()?;
        d.initial.get(track).ok_or_else(|| not_clean(&d.matrices))
    }

    /// Nested-bracket export of the matrix of `track`.
    pub fn export_matrix(&self, track: Track, style: BracketStyle) -> GraphResult<String> {
        Ok(self.matrix(track)?.to_nested_brackets(style))
    }

    // ── Observers ────────────────────────────────────────────────────

    pub fn subscribe(&mut self, callback: AdvanceCallback) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    pub fn subscribe_channel(&mut self) -> (SubscriptionId, Receiver<AdvanceNotice>) {
        self.observers.subscribe_channel()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn topology_changed(&mut self) {
        self.supplied_arcs = None;
        self.invalidate();
    }
}

fn not_clean(matrices: &TransitionMatrices) -> GraphError {
    GraphError::NotClean {
        row: matrices.unclean_row.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn build(n: usize, edges: &[(u32, u32, i64)]) -> Graph {
        let mut g = Graph::new();
        for _ in 0..n {
            g.add_vertex();
        }
        for &(a, b, w) in edges {
            g.add_edge(VertexId(a), VertexId(b), w).unwrap();
        }
        g
    }

    fn star3() -> Graph {
        build(4, &[(0, 1, 1), (0, 2, 1), (0, 3, 1)])
    }

    fn lollipop() -> Graph {
        build(4, &[(0, 1, 1), (1, 2, 1), (2, 0, 1), (2, 3, 2)])
    }

    fn k4() -> Graph {
        build(4, &[(0, 1, 1), (0, 2, 1), (0, 3, 1), (1, 2, 1), (1, 3, 1), (2, 3, 1)])
    }

    fn count(g: &mut Graph, track: Track, mode: Mode) -> usize {
        g.compute_stabilization(track, mode).unwrap().iterations
    }

    #[test]
    fn test_single_edge_rejected_before_matrix_work() {
        let mut g = build(2, &[(0, 1, 1)]);
        assert!(matches!(g.initialize(), Err(GraphError::InvalidTopology(_))));
        assert!(!g.is_ready());
        assert!(matches!(
            g.compute_stabilization(Track::Binary, Mode::Ordinary),
            Err(GraphError::InvalidTopology(_))
        ));
    }

    #[test]
    fn test_disconnected_rejected() {
        let mut g = build(4, &[(0, 1, 1), (2, 3, 1)]);
        assert!(matches!(g.initialize(), Err(GraphError::InvalidTopology(_))));
    }

    #[test]
    fn test_accessors_before_initialize() {
        let g = star3();
        assert_eq!(g.matrix(Track::Binary), Err(GraphError::NotInitialized));
        assert_eq!(g.arc_graph().err(), Some(GraphError::NotInitialized));
    }

    #[test]
    fn test_star_counts_on_every_track() {
        let mut g = star3();
        assert_eq!(count(&mut g, Track::Binary, Mode::Ordinary), 2);
        assert_eq!(count(&mut g, Track::Stochastic, Mode::Ordinary), 2);
        assert_eq!(count(&mut g, Track::Scattering, Mode::Ordinary), 2);
        let report = g.compute_stabilization(Track::Binary, Mode::MaxPlus).unwrap();
        assert_eq!(report.iterations, 2);
        assert_eq!(report.coefficient, Some(2.0));
    }

    #[test]
    fn test_star_from_leaf() {
        let mut g = star3();
        g.select_start(VertexId(1)).unwrap();
        for track in Track::ALL {
            assert_eq!(count(&mut g, track, Mode::Ordinary), 3, "{track}");
        }
    }

    #[test]
    fn test_complete_graph_is_clean() {
        let mut g = k4();
        g.initialize().unwrap();
        assert_eq!(g.is_clean(), Ok(true));
        for track in Track::ALL {
            assert_eq!(count(&mut g, track, Mode::Ordinary), 4, "{track}");
        }
    }

    #[test]
    fn test_weighted_star() {
        let mut g = build(4, &[(0, 1, 2), (0, 2, 1), (0, 3, 3)]);
        g.initialize().unwrap();
        assert_eq!(g.arc_graph().unwrap().len(), 12);
        assert_eq!(g.is_clean(), Ok(true));
        for track in Track::ALL {
            assert_eq!(count(&mut g, track, Mode::Ordinary), 6, "{track}");
        }
    }

    #[test]
    fn test_path_and_parallel_edges() {
        let mut path = build(3, &[(0, 1, 1), (1, 2, 1)]);
        assert_eq!(count(&mut path, Track::Binary, Mode::Ordinary), 3);
        assert_eq!(count(&mut path, Track::Stochastic, Mode::Ordinary), 3);

        let mut parallel = build(2, &[(0, 1, 1), (0, 1, 2)]);
        assert_eq!(count(&mut parallel, Track::Binary, Mode::Ordinary), 5);
        assert_eq!(count(&mut parallel, Track::Stochastic, Mode::Ordinary), 5);
    }

    #[test]
    fn test_run_all_skips_scattering_when_not_clean() {
        let mut g = lollipop();
        let summary = g.run_all(Mode::Ordinary).unwrap();
        assert_eq!(summary.binary.report().map(|r| r.iterations), Some(6));
        assert_eq!(summary.stochastic.report().map(|r| r.iterations), Some(6));
        assert!(summary.scattering.is_skipped());
        assert!(matches!(
            g.state_vector(Track::Scattering),
            Err(GraphError::NotClean { .. })
        ));
    }

    #[test]
    fn test_run_all_maxplus_only_binary() {
        let mut g = star3();
        let summary = g.run_all(Mode::MaxPlus).unwrap();
        assert_eq!(summary.binary.report().and_then(|r| r.coefficient), Some(2.0));
        assert!(summary.stochastic.is_skipped());
        assert!(summary.scattering.is_skipped());
    }

    #[test]
    fn test_maxplus_on_fractional_track_rejected() {
        let mut g = star3();
        assert_eq!(
            g.compute_stabilization(Track::Stochastic, Mode::MaxPlus),
            Err(GraphError::UnsupportedMode {
                track: Track::Stochastic,
                mode: Mode::MaxPlus
            })
        );
    }

    #[test]
    fn test_budget_reports_partial_count() {
        let cfg = EngineConfig {
            max_iterations: 1,
            ..EngineConfig::default()
        };
        let mut g = lollipop();
        g.set_config(cfg).unwrap();
        assert_eq!(
            g.compute_stabilization(Track::Binary, Mode::Ordinary),
            Err(GraphError::NonConvergent {
                track: Track::Binary,
                iterations: 2
            })
        );
        let summary = g.run_all(Mode::Ordinary).unwrap();
        assert!(summary.binary.is_skipped());
    }

    #[test]
    fn test_cancel_from_observer() {
        let mut g = lollipop();
        let token = g.cancel_token();
        let id = g.subscribe(Box::new(move |e| {
            if e.iteration == 3 {
                token.cancel();
            }
        }));
        assert_eq!(
            g.compute_stabilization(Track::Binary, Mode::Ordinary),
            Err(GraphError::Cancelled { iterations: 3 })
        );
        assert!(g.run_all(Mode::Ordinary).is_err());
        g.unsubscribe(id);
        g.cancel_token().reset();
        assert_eq!(count(&mut g, Track::Binary, Mode::Ordinary), 6);
    }

    #[test]
    fn test_observers_see_every_advance() {
        let mut g = lollipop();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let id = g.subscribe(Box::new(move |e| {
            s.lock().unwrap().push((e.track, e.iteration, e.current().len()));
        }));
        g.compute_stabilization(Track::Binary, Mode::Ordinary).unwrap();
        let expected: Vec<_> = (2..=6).map(|i| (Track::Binary, i, 10)).collect();
        assert_eq!(*seen.lock().unwrap(), expected);

        assert!(g.unsubscribe(id));
        g.compute_stabilization(Track::Binary, Mode::Ordinary).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 5);
    }

    #[test]
    fn test_panicking_observer_does_not_abort_run() {
        let mut g = star3();
        g.subscribe(Box::new(|_| panic!("bad observer")));
        assert_eq!(count(&mut g, Track::Binary, Mode::Ordinary), 2);
    }

    #[test]
    fn test_channel_observer_gets_final_vector() {
        let mut g = star3();
        let (_, rx) = g.subscribe_channel();
        g.compute_stabilization(Track::Binary, Mode::Ordinary).unwrap();
        let last = rx.try_iter().last().unwrap();
        assert_eq!(&last.vector, g.state_vector(Track::Binary).unwrap());
    }

    #[test]
    fn test_each_run_restarts_from_initial_vector() {
        let mut g = lollipop();
        let first = count(&mut g, Track::Binary, Mode::Ordinary);
        let second = count(&mut g, Track::Binary, Mode::Ordinary);
        assert_eq!(first, second);
        assert_ne!(
            g.state_vector(Track::Binary).unwrap(),
            g.initial_vector(Track::Binary).unwrap()
        );
    }

    #[test]
    fn test_initial_vectors() {
        let mut g = star3();
        g.initialize().unwrap();
        let m = g.initial_vector(Track::Binary).unwrap();
        assert_eq!(m.sum(), 3.0);
        let p = g.initial_vector(Track::Stochastic).unwrap();
        assert!((p.sum() - 1.0).abs() < 1e-12);
        assert_eq!(g.initial_vector(Track::Scattering).unwrap(), m);
    }

    #[test]
    fn test_mutation_invalidates() {
        let mut g = star3();
        g.initialize().unwrap();
        assert!(g.is_ready());
        g.set_weight(0, 2).unwrap();
        assert!(!g.is_ready());
        g.initialize().unwrap();
        assert_eq!(g.arc_graph().unwrap().len(), 8);

        g.topology_mut().add_vertex();
        assert!(g.is_ready());
        g.invalidate();
        assert!(!g.is_ready());
    }

    #[test]
    fn test_failed_mutation_keeps_state() {
        let mut g = star3();
        g.initialize().unwrap();
        assert!(g.add_edge(VertexId(0), VertexId(0), 1).is_err());
        assert!(g.set_weight(0, 0).is_err());
        assert!(g.is_ready());
    }

    #[test]
    fn test_default_start_is_first_vertex() {
        let mut g = star3();
        assert_eq!(g.starting_vertex(), None);
        g.initialize().unwrap();
        assert_eq!(g.starting_vertex(), Some(VertexId(0)));
        assert!(g.select_start(VertexId(9)).is_err());
    }

    #[test]
    fn test_supplied_arc_graph_is_used() {
        let mut g = star3();
        let arcs = ArcGraph::expand(g.topology());
        g.supply_arc_graph(arcs.clone()).unwrap();
        g.initialize().unwrap();
        assert_eq!(g.arc_graph().unwrap(), &arcs);

        let other = ArcGraph::expand(lollipop().topology());
        assert!(g.supply_arc_graph(other).is_err());
    }

    #[test]
    fn test_export_matrix() {
        let mut g = build(3, &[(0, 1, 1), (1, 2, 1)]);
        g.initialize().unwrap();
        let out = g.export_matrix(Track::Binary, BracketStyle::Curly).unwrap();
        assert!(out.starts_with("{{"));
        assert_eq!(out.matches('{').count(), 5);
    }

    #[test]
    fn test_decoded_topology_cannot_bypass_edge_rules() {
        let vertices = r#"[{"id":0,"label":0},{"id":1,"label":1},{"id":2,"label":2}]"#;
        let decode = |edges: &str| {
            serde_json::from_str::<Topology>(&format!(
                r#"{{"vertices":{vertices},"edges":{edges}}}"#
            ))
        };
        let edges = |list: &[(u32, u32, u32)]| {
            let items: Vec<String> = list
                .iter()
                .map(|(s, t, w)| format!(r#"{{"source":{s},"target":{t},"weight":{w}}}"#))
                .collect();
            format!("[{}]", items.join(","))
        };
        assert!(decode(&edges(&[(0, 1, 0), (1, 2, 1)])).is_err());
        assert!(decode(&edges(&[(0, 1, 1), (1, 7, 1)])).is_err());

        let valid = edges(&[(0, 1, 1), (1, 2, 1)]);
        let topology = decode(&valid).unwrap();
        let mut g = Graph::from_topology(topology, None, EngineConfig::default()).unwrap();
        g.initialize().unwrap();
        assert_eq!(g.arc_graph().unwrap().len(), 4);
        assert_eq!(count(&mut g, Track::Binary, Mode::Ordinary), 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = EngineConfig {
            max_iterations: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(Graph::with_config(cfg), Err(GraphError::Config(_))));
    }
}
