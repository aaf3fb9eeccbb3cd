//! Pairing Graph
//!
//! Undirected simple graph with string-keyed vertices and integer edge weights.
//! Adjacency is insertion-ordered so that every traversal the matcher performs
//! is deterministic for identical inputs.
//!

use super::util::*;
use indexmap::IndexMap;

/// matching result: every vertex key maps to its mate's key, or None when the
/// vertex stays unmatched; iteration order follows node insertion order
pub type MateMap = IndexMap<String, Option<String>>;

#[derive(Debug, Clone, Default)]
pub struct PairingGraph {
    /// vertex keys in insertion order
    keys: Vec<String>,
    /// key -> vertex index
    indices: IndexMap<String, VertexIndex>,
    /// per-vertex neighbour map in insertion order: neighbour index -> weight
    adjacency: Vec<IndexMap<VertexIndex, Weight>>,
    /// number of undirected edges
    edge_num: usize,
}

impl PairingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// add a vertex if it is not present yet; returns its index either way
    pub fn add_node(&mut self, key: &str) -> VertexIndex {
        if let Some(&index) = self.indices.get(key) {
            return index;
        }
        let index = self.keys.len();
        self.keys.push(key.to_string());
        self.indices.insert(key.to_string(), index);
        self.adjacency.push(IndexMap::new());
        index
    }

    /// add an undirected edge; both endpoints must already be present;
    /// self-loops are rejected and re-adding an edge overwrites its weight
    pub fn add_edge(&mut self, a: &str, b: &str, weight: Weight) {
        let u = *self.indices.get(a).unwrap_or_else(|| panic!("unknown vertex {a}"));
        let v = *self.indices.get(b).unwrap_or_else(|| panic!("unknown vertex {b}"));
        assert!(u != v, "self-loop rejected on vertex {a}");
        if self.adjacency[u].insert(v, weight).is_none() {
            self.edge_num += 1;
        }
        self.adjacency[v].insert(u, weight);
    }

    pub fn node_num(&self) -> VertexNum {
        self.keys.len()
    }

    pub fn edge_num(&self) -> usize {
        self.edge_num
    }

    pub fn has_node(&self, key: &str) -> bool {
        self.indices.contains_key(key)
    }

    pub fn node_key(&self, index: VertexIndex) -> &str {
        &self.keys[index]
    }

    pub fn node_index(&self, key: &str) -> Option<VertexIndex> {
        self.indices.get(key).copied()
    }

    /// neighbours of a vertex in edge insertion order
    pub fn neighbours(&self, index: VertexIndex) -> impl Iterator<Item = VertexIndex> + '_ {
        self.adjacency[index].keys().copied()
    }

    pub fn degree(&self, index: VertexIndex) -> usize {
        self.adjacency[index].len()
    }

    pub fn edge_weight(&self, u: VertexIndex, v: VertexIndex) -> Option<Weight> {
        self.adjacency[u].get(&v).copied()
    }

    /// every undirected edge once, as (smaller endpoint of first sight, peer, weight);
    /// order follows the insertion order of the adjacency lists
    pub fn edges(&self) -> Vec<(VertexIndex, VertexIndex, Weight)> {
        let mut edges = Vec::with_capacity(self.edge_num);
        for (u, neighbours) in self.adjacency.iter().enumerate() {
            for (&v, &weight) in neighbours.iter() {
                if u < v {
                    edges.push((u, v, weight));
                }
            }
        }
        edges
    }

    pub fn max_edge_weight(&self) -> Weight {
        let mut max_weight = 0;
        for (_, _, weight) in self.edges() {
            if weight > max_weight {
                max_weight = weight;
            }
        }
        max_weight
    }

    /// double every edge weight in place; the matcher calls this on its own
    /// copy so duals and slacks stay integral
    pub fn double_weights(&mut self) {
        for neighbours in self.adjacency.iter_mut() {
            for (_, weight) in neighbours.iter_mut() {
                *weight *= 2;
            }
        }
    }
}
