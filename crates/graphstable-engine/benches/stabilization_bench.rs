// ─────────────────────────────────────────────────────────────────────
// GraphStable — Stabilization Benchmarks
// ─────────────────────────────────────────────────────────────────────
//! Criterion benchmarks for the hot paths:
//!   - Arc expansion (weighted ring)
//!   - Matrix build (M, P, S)
//!   - Ordinary and max-plus stabilization on the binary track
//!   - Full `run_all` through the orchestrator

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use graphstable_core::builder::indicator_vector;
use graphstable_core::{ArcGraph, Topology, TransitionMatrices, VertexId};
use graphstable_engine::{Budget, Graph, StabilizationDetector, StoppingRule};
use graphstable_types::{EngineConfig, Mode, Track};

// ── Helpers ───────────────────────────────────────────────────────────

/// Ring of `n` vertices with weights cycling 1..=3, plus one chord.
fn make_ring(n: u32) -> Topology {
    let mut t = Topology::new();
    for _ in 0..n {
        t.add_vertex();
    }
    for i in 0..n {
        let w = i64::from(i % 3 + 1);
        t.add_edge(VertexId(i), VertexId((i + 1) % n), w).expect("ring edge");
    }
    t.add_edge(VertexId(0), VertexId(n / 2), 1).expect("ring chord");
    t
}

/// Star with `n` unit leaves (clean, all three tracks run).
fn make_star(n: u32) -> Topology {
    let mut t = Topology::new();
    let hub = t.add_vertex();
    for _ in 0..n {
        let leaf = t.add_vertex();
        t.add_edge(hub, leaf, 1).expect("star edge");
    }
    t
}

// ── Benchmarks ────────────────────────────────────────────────────────

fn bench_expand(c: &mut Criterion) {
    let ring = make_ring(24);
    c.bench_function("expand_ring_24", |b| {
        b.iter(|| ArcGraph::expand(black_box(&ring)))
    });
}

fn bench_matrices(c: &mut Criterion) {
    let arcs = ArcGraph::expand(&make_star(16));
    c.bench_function("build_matrices_star_16", |b| {
        b.iter(|| TransitionMatrices::build(black_box(&arcs)))
    });
}

fn bench_detector(c: &mut Criterion) {
    let ring = make_ring(12);
    let arcs = ArcGraph::expand(&ring);
    let matrices = TransitionMatrices::build(&arcs).expect("ring matrices");
    let cfg = EngineConfig::default();
    let budget = Budget::from_config(&cfg);
    let start = indicator_vector(&arcs, VertexId(0));

    for mode in [Mode::Ordinary, Mode::MaxPlus] {
        let rule = StoppingRule::for_track(Track::Binary, mode, ring.max_edge_weight(), &cfg)
            .expect("binary track supports both modes");
        c.bench_function(&format!("stabilize_ring_12_{mode}"), |b| {
            b.iter(|| {
                let mut v = start.clone();
                let mut det = StabilizationDetector::new(Track::Binary, &matrices.binary, rule);
                det.run(black_box(&mut v), &budget, None, |_, _| {})
            })
        });
    }
}

fn bench_run_all(c: &mut Criterion) {
    let mut graph = Graph::from_topology(make_star(8), None, EngineConfig::default())
        .expect("star graph");
    c.bench_function("run_all_star_8", |b| {
        b.iter(|| graph.run_all(black_box(Mode::Ordinary)))
    });
}

criterion_group!(
    benches,
    bench_expand,
    bench_matrices,
    bench_detector,
    bench_run_all
);
criterion_main!(benches);
