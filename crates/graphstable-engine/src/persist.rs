// ─────────────────────────────────────────────────────────────────────
// GraphStable — Persisted Graph State
// ─────────────────────────────────────────────────────────────────────
//! Only the topology and the starting vertex are stored. Arcs, matrices
//! and vectors are recomputed after loading.

use std::fs;
use std::path::Path;

use graphstable_core::{Topology, VertexId};
use graphstable_types::{EngineConfig, GraphError, GraphResult};
use serde::{Deserialize, Serialize};

use crate::graph::Graph;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedVertex {
    pub id: u32,
    pub label: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedEdge {
    pub source: u32,
    pub target: u32,
    /// Signed so that a stored weight of 0 or below reaches validation
    /// instead of failing as a parse error.
    pub weight: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedGraph {
    pub format_version: u32,
    pub vertices: Vec<PersistedVertex>,
    pub edges: Vec<PersistedEdge>,
    #[serde(default)]
    pub starting: Option<u32>,
}

impl PersistedGraph {
    pub fn capture(graph: &Graph) -> Self {
        let topology = graph.topology();
        Self {
            format_version: FORMAT_VERSION,
            vertices: topology
                .vertices()
                .iter()
                .map(|v| PersistedVertex {
                    id: v.id.0,
                    label: v.label,
                })
                .collect(),
            edges: topology
                .edges()
                .iter()
                .map(|e| PersistedEdge {
                    source: e.source.0,
                    target: e.target.0,
                    weight: i64::from(e.weight),
                })
                .collect(),
            starting: graph.starting_vertex().map(|v| v.0),
        }
    }

    /// Rebuild a graph. Vertex ids must be dense and in order, since they
    /// index the arena.
    pub fn restore(&self, config: EngineConfig) -> GraphResult<Graph> {
        if self.format_version != FORMAT_VERSION {
            return Err(GraphError::Persistence(format!(
                "unsupported format version {} (expected {FORMAT_VERSION})",
                self.format_version
            )));
        }
        let mut topology = Topology::new();
        for (i, v) in self.vertices.iter().enumerate() {
            if v.id as usize != i {
                return Err(GraphError::Persistence(format!(
                    "vertex at position {i} has id {}; ids must be 0..n in order",
                    v.id
                )));
            }
            topology.add_labelled_vertex(v.label);
        }
        for (i, e) in self.edges.iter().enumerate() {
            topology
                .add_edge(VertexId(e.source), VertexId(e.target), e.weight)
                .map_err(|err| GraphError::Persistence(format!("edge {i}: {err}")))?;
        }
        Graph::from_topology(topology, self.starting.map(VertexId), config)
            .map_err(|err| match err {
                GraphError::Config(_) => err,
                other => GraphError::Persistence(format!("starting vertex: {other}")),
            })
    }

    pub fn to_json(&self) -> GraphResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GraphError::Persistence(format!("JSON serialize error: {e}")))
    }

    pub fn from_json(json: &str) -> GraphResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| GraphError::Persistence(format!("JSON parse error: {e}")))
    }
}

impl Graph {
    pub fn to_json(&self) -> GraphResult<String> {
        PersistedGraph::capture(self).to_json()
    }

    pub fn from_json(json: &str, config: EngineConfig) -> GraphResult<Self> {
        PersistedGraph::from_json(json)?.restore(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> GraphResult<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        fs::write(path, json)
            .map_err(|e| GraphError::Persistence(format!("write {}: {e}", path.display())))?;
        log::info!("graph saved to {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>, config: EngineConfig) -> GraphResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| GraphError::Persistence(format!("read {}: {e}", path.display())))?;
        Self::from_json(&json, config)
    }
}
