// ─────────────────────────────────────────────────────────────────────
// GraphStable — Topology Model
// ─────────────────────────────────────────────────────────────────────
//! Vertices and weighted edges of the user-authored multigraph.
//!
//! Vertices live in an index-addressable arena: a `VertexId` is the
//! vertex's position in the arena and all membership/adjacency checks
//! compare ids by value.

use std::fmt;

use serde::{Deserialize, Serialize};

use graphstable_types::{GraphError, GraphResult};

/// Stable vertex identity (arena index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(pub u32);

impl VertexId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A vertex of the original topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    /// Integer label shown to users.
    pub label: u32,
}

/// Weighted directed pair of vertices.
///
/// Original edges are undirected in meaning; `source`/`target` only fix
/// the order in which the expander doubles them. Arcs produced by the
/// expander carry the index of the original edge in `provenance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: VertexId,
    pub target: VertexId,
    pub weight: u32,
    pub provenance: Option<usize>,
}

impl Edge {
    pub fn new(source: VertexId, target: VertexId, weight: u32) -> Self {
        Self {
            source,
            target,
            weight,
            provenance: None,
        }
    }

    /// Unit-weight arc descending from original edge `provenance`.
    pub fn unit_arc(source: VertexId, target: VertexId, provenance: usize) -> Self {
        Self {
            source,
            target,
            weight: 1,
            provenance: Some(provenance),
        }
    }

    /// True if the edge joins `a` and `b` in either direction.
    #[inline]
    pub fn joins(&self, a: VertexId, b: VertexId) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}

/// Validate a user-supplied weight.
pub fn checked_weight(weight: i64) -> GraphResult<u32> {
    if weight < 1 {
        return Err(GraphError::DegenerateWeight { weight });
    }
    u32::try_from(weight).map_err(|_| {
        GraphError::InvalidTopology(format!("edge weight {weight} exceeds {}", u32::MAX))
    })
}

/// Weighted multigraph: vertex arena plus edge list.
///
/// Deserialization rebuilds the arena through `add_labelled_vertex` and
/// `add_edge`, so a decoded topology satisfies the same rules as one
/// built by hand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTopology")]
pub struct Topology {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
}

#[derive(Deserialize)]
struct RawTopology {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
}

impl TryFrom<RawTopology> for Topology {
    type Error = GraphError;

    fn try_from(raw: RawTopology) -> GraphResult<Self> {
        let mut t = Topology::new();
        for (i, v) in raw.vertices.iter().enumerate() {
            if v.id.index() != i {
                return Err(GraphError::InvalidTopology(format!(
                    "vertex at position {i} has id {}; ids must be dense and ordered",
                    v.id
                )));
            }
            t.add_labelled_vertex(v.label);
        }
        for e in &raw.edges {
            t.add_edge(e.source, e.target, i64::from(e.weight))?;
        }
        Ok(t)
    }
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex labelled with the next integer.
    pub fn add_vertex(&mut self) -> VertexId {
        let label = self.vertices.len() as u32;
        self.add_labelled_vertex(label)
    }

    /// Add a vertex with an explicit label (used when restoring state).
    pub fn add_labelled_vertex(&mut self, label: u32) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(Vertex { id, label });
        id
    }

    /// Add an undirected edge; returns its index.
    ///
    /// Parallel edges are allowed. Self-loops and unknown endpoints are
    /// rejected as `InvalidTopology`, weights ≤ 0 as `DegenerateWeight`.
    pub fn add_edge(
        &mut self,
        source: VertexId,
        target: VertexId,
        weight: i64,
    ) -> GraphResult<usize> {
        let weight = checked_weight(weight)?;
        self.require_vertex(source)?;
        self.require_vertex(target)?;
        if source == target {
            return Err(GraphError::InvalidTopology(format!(
                "self-loop on {source} is not allowed"
            )));
        }
        self.edges.push(Edge::new(source, target, weight));
        Ok(self.edges.len() - 1)
    }

    /// Change the weight of an existing edge.
    pub fn set_weight(&mut self, edge: usize, weight: i64) -> GraphResult<()> {
        let weight = checked_weight(weight)?;
        let count = self.edges.len();
        let slot = self.edges.get_mut(edge).ok_or_else(|| {
            GraphError::InvalidTopology(format!("edge {edge} does not exist ({count} edges)"))
        })?;
        slot.weight = weight;
        Ok(())
    }

    pub fn contains(&self, id: VertexId) -> bool {
        id.index() < self.vertices.len()
    }

    pub fn require_vertex(&self, id: VertexId) -> GraphResult<&Vertex> {
        self.vertices.get(id.index()).ok_or_else(|| {
            GraphError::InvalidTopology(format!(
                "vertex {id} does not exist ({} vertices)",
                self.vertices.len()
            ))
        })
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.index())
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Largest original edge weight (1 when there are no edges).
    pub fn max_edge_weight(&self) -> u32 {
        self.edges.iter().map(|e| e.weight).max().unwrap_or(1).max(1)
    }

    /// Σ weights over original edges.
    pub fn total_weight(&self) -> u64 {
        self.edges.iter().map(|e| u64::from(e.weight)).sum()
    }

    pub fn are_neighbours(&self, a: VertexId, b: VertexId) -> bool {
        self.edges.iter().any(|e| e.joins(a, b))
    }

    /// Indices of all original edges joining `a` and `b`.
    pub fn edges_between(&self, a: VertexId, b: VertexId) -> Vec<usize> {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.joins(a, b))
            .map(|(i, _)| i)
            .collect()
    }

    /// Neighbours of `v` in arena order, without duplicates.
    pub fn neighbours(&self, v: VertexId) -> Vec<VertexId> {
        let mut seen = vec![false; self.vertices.len()];
        for e in &self.edges {
            if e.source == v {
                seen[e.target.index()] = true;
            } else if e.target == v {
                seen[e.source.index()] = true;
            }
        }
        seen.iter()
            .enumerate()
            .filter(|&(_, &s)| s)
            .map(|(i, _)| VertexId(i as u32))
            .collect()
    }

    /// Connectivity over the undirected interpretation of the edges.
    ///
    /// Iterative depth-first search from vertex 0. An empty topology is
    /// not connected.
    pub fn is_connected(&self) -> bool {
        let n = self.vertices.len();
        if n == 0 {
            return false;
        }

        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
        for e in &self.edges {
            adjacency[e.source.index()].push(e.target.index());
            adjacency[e.target.index()].push(e.source.index());
        }

        let mut visited = vec![false; n];
        let mut stack = vec![0usize];
        visited[0] = true;
        let mut reached = 1;
        while let Some(u) = stack.pop() {
            for &w in &adjacency[u] {
                if !visited[w] {
                    visited[w] = true;
                    reached += 1;
                    stack.push(w);
                }
            }
        }
        reached == n
    }

    /// Per-edge rules of `add_edge`: weight ≥ 1, known endpoints, no
    /// self-loop.
    pub fn validate_edges(&self) -> GraphResult<()> {
        for (i, e) in self.edges.iter().enumerate() {
            if e.weight == 0 {
                return Err(GraphError::DegenerateWeight { weight: 0 });
            }
            self.require_vertex(e.source)?;
            self.require_vertex(e.target)?;
            if e.source == e.target {
                return Err(GraphError::InvalidTopology(format!(
                    "edge {i} is a self-loop on {}",
                    e.source
                )));
            }
        }
        Ok(())
    }

    /// Preconditions of every stabilization computation: valid edges,
    /// connected, and more than one edge.
    pub fn validate_for_stabilization(&self) -> GraphResult<()> {
        self.validate_edges()?;
        if !self.is_connected() {
            return Err(GraphError::InvalidTopology(
                "stabilization time can only be calculated for a connected graph".to_string(),
            ));
        }
        if self.edges.len() <= 1 {
            return Err(GraphError::InvalidTopology(format!(
                "graph must have more than one edge, found {}",
                self.edges.len()
            )));
        }
        Ok(())
    }
}
