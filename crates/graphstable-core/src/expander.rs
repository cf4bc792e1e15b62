// ─────────────────────────────────────────────────────────────────────
// GraphStable — Arc Expander
// ─────────────────────────────────────────────────────────────────────
//! Doubling + splitting: every undirected edge of weight w becomes two
//! opposite chains of w unit arcs.
//!
//! Ordering contract: for each original edge in index order, the
//! forward chain (source → target) then the backward chain. Synthetic
//! intermediate vertices get ids after the original arena, allocated in
//! creation order, so expansion is a pure function of the topology.

use serde::{Deserialize, Serialize};

use graphstable_types::{GraphError, GraphResult};

use crate::topology::{Edge, Topology, VertexId};

/// Unit-delay arc graph derived from a `Topology`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawArcGraph")]
pub struct ArcGraph {
    split_edges: Vec<Edge>,
    split_vertices: Vec<VertexId>,
    original_vertices: usize,
    total_vertices: usize,
}

#[derive(Deserialize)]
struct RawArcGraph {
    split_edges: Vec<Edge>,
    split_vertices: Vec<VertexId>,
    original_vertices: usize,
    total_vertices: usize,
}

impl TryFrom<RawArcGraph> for ArcGraph {
    type Error = GraphError;

    fn try_from(raw: RawArcGraph) -> GraphResult<Self> {
        let arcs = Self {
            split_edges: raw.split_edges,
            split_vertices: raw.split_vertices,
            original_vertices: raw.original_vertices,
            total_vertices: raw.total_vertices,
        };
        arcs.check_structure()?;
        Ok(arcs)
    }
}

impl ArcGraph {
    /// Expand every edge of `topology` into unit arcs.
    pub fn expand(topology: &Topology) -> Self {
        let original = topology.vertex_count();
        let arc_count = 2 * topology.total_weight() as usize;
        let mut ex = Expander::new(original, arc_count);

        for (index, edge) in topology.edges().iter().enumerate() {
            ex.split(edge.source, edge.target, edge.weight, index);
            ex.split(edge.target, edge.source, edge.weight, index);
        }

        Self {
            total_vertices: ex.next_id as usize,
            split_edges: ex.arcs,
            split_vertices: ex.order,
            original_vertices: original,
        }
    }

    /// Check that an externally supplied arc graph is consistent with
    /// `topology` before it replaces a fresh expansion.
    pub fn check_against(&self, topology: &Topology) -> GraphResult<()> {
        let expected = 2 * topology.total_weight() as usize;
        if self.split_edges.len() != expected {
            return Err(GraphError::InvalidTopology(format!(
                "arc graph has {} arcs, topology expands to {expected}",
                self.split_edges.len()
            )));
        }
        if self.original_vertices != topology.vertex_count() {
            return Err(GraphError::InvalidTopology(format!(
                "arc graph was expanded from {} vertices, topology has {}",
                self.original_vertices,
                topology.vertex_count()
            )));
        }
        self.check_structure()?;
        for (i, arc) in self.split_edges.iter().enumerate() {
            if !arc.provenance.is_some_and(|p| p < topology.edge_count()) {
                return Err(GraphError::InvalidTopology(format!(
                    "arc {i} is not a valid unit arc of this topology"
                )));
            }
        }
        Ok(())
    }

    /// Internal consistency: unit arcs with provenance, every id below
    /// `total_vertices`.
    fn check_structure(&self) -> GraphResult<()> {
        if self.original_vertices > self.total_vertices {
            return Err(GraphError::InvalidTopology(format!(
                "arc graph claims {} original vertices but only {} in total",
                self.original_vertices, self.total_vertices
            )));
        }
        for (i, arc) in self.split_edges.iter().enumerate() {
            let ids_ok = arc.source.index() < self.total_vertices
                && arc.target.index() < self.total_vertices;
            if arc.weight != 1 || arc.provenance.is_none() || !ids_ok {
                return Err(GraphError::InvalidTopology(format!(
                    "arc {i} is not a unit arc of this arc graph"
                )));
            }
        }
        if let Some(v) = self.split_vertices.iter().find(|v| v.index() >= self.total_vertices) {
            return Err(GraphError::InvalidTopology(format!(
                "split vertex {v} is outside the arc graph"
            )));
        }
        Ok(())
    }

    pub fn arcs(&self) -> &[Edge] {
        &self.split_edges
    }

    pub fn arc(&self, index: usize) -> Option<&Edge> {
        self.split_edges.get(index)
    }

    /// Number of arcs (= dimension of every derived matrix).
    pub fn len(&self) -> usize {
        self.split_edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.split_edges.is_empty()
    }

    /// Every vertex touched during expansion, in first-encounter order.
    pub fn split_vertices(&self) -> &[VertexId] {
        &self.split_vertices
    }

    /// Original plus synthetic vertex count.
    pub fn vertex_count(&self) -> usize {
        self.total_vertices
    }

    pub fn is_synthetic(&self, v: VertexId) -> bool {
        v.index() >= self.original_vertices && v.index() < self.total_vertices
    }

    /// Indices of arcs leaving `v`.
    pub fn arcs_leaving(&self, v: VertexId) -> impl Iterator<Item = usize> + '_ {
        self.split_edges
            .iter()
            .enumerate()
            .filter(move |(_, arc)| arc.source == v)
            .map(|(i, _)| i)
    }

    /// Directed arc `a → b` exists.
    pub fn has_arc(&self, a: VertexId, b: VertexId) -> bool {
        self.split_edges
            .iter()
            .any(|arc| arc.source == a && arc.target == b)
    }

    /// Indices of arcs joining `a` and `b` in either direction.
    pub fn arcs_between(&self, a: VertexId, b: VertexId) -> Vec<usize> {
        self.split_edges
            .iter()
            .enumerate()
            .filter(|(_, arc)| arc.joins(a, b))
            .map(|(i, _)| i)
            .collect()
    }
}

struct Expander {
    next_id: u32,
    registered: Vec<bool>,
    order: Vec<VertexId>,
    arcs: Vec<Edge>,
}

impl Expander {
    fn new(original_vertices: usize, arc_capacity: usize) -> Self {
        Self {
            next_id: original_vertices as u32,
            registered: vec![false; original_vertices],
            order: Vec::with_capacity(original_vertices),
            arcs: Vec::with_capacity(arc_capacity),
        }
    }

    fn register(&mut self, v: VertexId) {
        let i = v.index();
        if i >= self.registered.len() {
            self.registered.resize(i + 1, false);
        }
        if !self.registered[i] {
            self.registered[i] = true;
            self.order.push(v);
        }
    }

    fn fresh_vertex(&mut self) -> VertexId {
        let v = VertexId(self.next_id);
        self.next_id += 1;
        v
    }

    /// Replace the weight-w arc `source → target` by a chain of w unit
    /// arcs through w−1 fresh vertices.
    fn split(&mut self, source: VertexId, target: VertexId, weight: u32, provenance: usize) {
        let mut tail = source;
        self.register(tail);
        for _ in 1..weight {
            let next = self.fresh_vertex();
            self.arcs.push(Edge::unit_arc(tail, next, provenance));
            self.register(next);
            tail = next;
        }
        self.arcs.push(Edge::unit_arc(tail, target, provenance));
        self.register(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology(n: usize, edges: &[(u32, u32, i64)]) -> Topology {
        let mut t = Topology::new();
        for _ in 0..n {
            t.add_vertex();
        }
        for &(a, b, w) in edges {
            t.add_edge(VertexId(a), VertexId(b), w).unwrap();
        }
        t
    }

    #[test]
    fn test_single_unit_edge_doubles() {
        let arcs = ArcGraph::expand(&topology(2, &[(0, 1, 1)]));
        assert_eq!(arcs.len(), 2);
        assert_eq!(arcs.arcs()[0].source, VertexId(0));
        assert_eq!(arcs.arcs()[0].target, VertexId(1));
        assert_eq!(arcs.arcs()[1].source, VertexId(1));
        assert_eq!(arcs.arcs()[1].target, VertexId(0));
        assert_eq!(arcs.split_vertices(), &[VertexId(0), VertexId(1)]);
        assert_eq!(arcs.vertex_count(), 2);
    }

    #[test]
    fn test_weight_three_splits_into_chains() {
        let arcs = ArcGraph::expand(&topology(2, &[(0, 1, 3)]));
        assert_eq!(arcs.len(), 6);
        assert!(arcs.arcs().iter().all(|a| a.weight == 1));
        assert!(arcs.arcs().iter().all(|a| a.provenance == Some(0)));

        // Forward chain 0 → 2 → 3 → 1, backward chain 1 → 4 → 5 → 0.
        let ends: Vec<(u32, u32)> = arcs
            .arcs()
            .iter()
            .map(|a| (a.source.0, a.target.0))
            .collect();
        assert_eq!(ends, vec![(0, 2), (2, 3), (3, 1), (1, 4), (4, 5), (5, 0)]);
        assert_eq!(arcs.vertex_count(), 6);
        assert!(arcs.is_synthetic(VertexId(4)));
        assert!(!arcs.is_synthetic(VertexId(1)));
    }

    #[test]
    fn test_split_vertices_registered_once_in_encounter_order() {
        let arcs = ArcGraph::expand(&topology(3, &[(0, 1, 2), (1, 2, 1)]));
        let ids: Vec<u32> = arcs.split_vertices().iter().map(|v| v.0).collect();
        assert_eq!(ids, vec![0, 3, 1, 4, 2]);
    }

    #[test]
    fn test_provenance_follows_edge_index() {
        let arcs = ArcGraph::expand(&topology(3, &[(0, 1, 1), (1, 2, 2), (2, 0, 1)]));
        let parents: Vec<usize> = arcs.arcs().iter().filter_map(|a| a.provenance).collect();
        assert_eq!(parents, vec![0, 0, 1, 1, 1, 1, 2, 2]);
    }

    #[test]
    fn test_heavy_edge_does_not_recurse() {
        let arcs = ArcGraph::expand(&topology(2, &[(0, 1, 200_000)]));
        assert_eq!(arcs.len(), 400_000);
        assert_eq!(arcs.split_vertices().len(), 2 + 2 * 199_999);
    }

    #[test]
    fn test_expansion_is_deterministic() {
        let t = topology(4, &[(0, 1, 2), (1, 2, 3), (2, 3, 1), (3, 0, 2)]);
        assert_eq!(ArcGraph::expand(&t), ArcGraph::expand(&t));
    }

    #[test]
    fn test_queries_on_expanded_graph() {
        let arcs = ArcGraph::expand(&topology(3, &[(0, 1, 1), (1, 2, 1)]));
        assert!(arcs.has_arc(VertexId(1), VertexId(2)));
        assert!(!arcs.has_arc(VertexId(0), VertexId(2)));
        assert_eq!(arcs.arcs_between(VertexId(0), VertexId(1)), vec![0, 1]);
        let leaving: Vec<usize> = arcs.arcs_leaving(VertexId(1)).collect();
        assert_eq!(leaving, vec![1, 2]);
    }

    #[test]
    fn test_check_against_detects_stale_graph() {
        let mut t = topology(3, &[(0, 1, 1), (1, 2, 1)]);
        let arcs = ArcGraph::expand(&t);
        assert!(arcs.check_against(&t).is_ok());
        t.set_weight(0, 2).unwrap();
        assert!(matches!(
            arcs.check_against(&t),
            Err(GraphError::InvalidTopology(_))
        ));
    }

    #[test]
    fn test_decoded_arc_graph_checks_structure() {
        let arcs = ArcGraph::expand(&topology(3, &[(0, 1, 2), (1, 2, 1)]));
        let mut value = serde_json::to_value(&arcs).unwrap();
        let back: ArcGraph = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(back, arcs);

        value["split_edges"][0]["target"] = serde_json::json!(99);
        assert!(serde_json::from_value::<ArcGraph>(value.clone()).is_err());
        value["split_edges"][0]["target"] = serde_json::json!(1);
        value["split_edges"][0]["weight"] = serde_json::json!(2);
        assert!(serde_json::from_value::<ArcGraph>(value).is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_topology() -> impl Strategy<Value = Topology> {
            (2u32..7).prop_flat_map(|n| {
                prop::collection::vec((0..n, 0..n, 1i64..6), 0..10).prop_map(move |raw| {
                    let mut t = Topology::new();
                    for _ in 0..n {
                        t.add_vertex();
                    }
                    for (a, b, w) in raw {
                        if a != b {
                            t.add_edge(VertexId(a), VertexId(b), w).unwrap();
                        }
                    }
                    t
                })
            })
        }

        proptest! {
            /// Property: arc count is twice the total weight.
            #[test]
            fn prop_arc_count_is_twice_total_weight(t in arb_topology()) {
                let arcs = ArcGraph::expand(&t);
                prop_assert_eq!(arcs.len() as u64, 2 * t.total_weight());
                prop_assert!(arcs.arcs().iter().all(|a| a.weight == 1));
            }

            /// Property: every touched vertex is registered exactly once.
            #[test]
            fn prop_split_vertices_unique(t in arb_topology()) {
                let arcs = ArcGraph::expand(&t);
                let mut seen = std::collections::HashSet::new();
                for v in arcs.split_vertices() {
                    prop_assert!(seen.insert(*v));
                }
                for a in arcs.arcs() {
                    prop_assert!(seen.contains(&a.source));
                    prop_assert!(seen.contains(&a.target));
                }
            }

            /// Property: expansion is a pure function of the topology.
            #[test]
            fn prop_expansion_deterministic(t in arb_topology()) {
                prop_assert_eq!(ArcGraph::expand(&t), ArcGraph::expand(&t));
            }
        }
    }
}
