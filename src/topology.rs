//! Topology adapter (C6): translates an undirected edge set into a per-node
//! neighbor index and a symmetric distance map.
//!
//! Random-graph generation itself is out of scope here (spec.md §1) — this
//! module only consumes whatever edge set an external generator (or
//! [`crate::graphgen`] for the CLI harness) produces.

use std::collections::HashMap;

use crate::node_id::NodeId;

/// Default edge weight (logical-time units) applied by the "uniform
/// distance" topology consumer interface (spec.md §6).
pub const DEFAULT_EDGE_DISTANCE: u64 = 10;

/// Distance map keyed by ordered pair, plus the derived neighbor index.
///
/// `distances` is populated in one direction only (as the edges were given);
/// symmetric lookup is the simulator's responsibility, matching spec.md §3.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    distances: HashMap<(NodeId, NodeId), u64>,
    neighbors: HashMap<NodeId, Vec<NodeId>>,
}

impl Topology {
    /// Build a topology from a weighted undirected edge set.
    pub fn from_edges(edges: impl IntoIterator<Item = (NodeId, NodeId, u64)>) -> Self {
        let mut distances = HashMap::new();
        let mut neighbors: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

        for (u, v, weight) in edges {
            distances.insert((u, v), weight);
            neighbors.entry(u).or_default().push(v);
            neighbors.entry(v).or_default().push(u);
        }

        Topology { distances, neighbors }
    }

    /// Build a topology from an undirected edge set, stamping
    /// [`DEFAULT_EDGE_DISTANCE`] on every edge.
    pub fn from_unweighted_edges(edges: impl IntoIterator<Item = (NodeId, NodeId)>) -> Self {
        Self::from_edges(edges.into_iter().map(|(u, v)| (u, v, DEFAULT_EDGE_DISTANCE)))
    }

    pub fn neighbors_of(&self, id: NodeId) -> &[NodeId] {
        self.neighbors.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.neighbors.keys().copied()
    }

    /// Distance between `a` and `b`, checked symmetrically.
    pub fn symmetric_distance(&self, a: NodeId, b: NodeId) -> Option<u64> {
        self.distances.get(&(a, b)).or_else(|| self.distances.get(&(b, a))).copied()
    }

    /// Whether an edge exists between `a` and `b` in either direction.
    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.distances.contains_key(&(a, b)) || self.distances.contains_key(&(b, a))
    }

    pub fn distances(&self) -> &HashMap<(NodeId, NodeId), u64> {
        &self.distances
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(id: u32) -> NodeId {
        NodeId::new(id)
    }

    #[test]
    fn lookup_is_symmetric_regardless_of_insertion_direction() {
        let topo = Topology::from_edges([(n(0), n(1), 10)]);
        assert_eq!(topo.symmetric_distance(n(0), n(1)), Some(10));
        assert_eq!(topo.symmetric_distance(n(1), n(0)), Some(10));
    }

    #[test]
    fn neighbors_are_derived_from_both_endpoints() {
        let topo = Topology::from_edges([(n(0), n(1), 10), (n(1), n(2), 10)]);
        assert_eq!(topo.neighbors_of(n(1)), &[n(0), n(2)]);
        assert_eq!(topo.neighbors_of(n(0)), &[n(1)]);
        assert!(topo.neighbors_of(n(99)).is_empty());
    }

    #[test]
    fn unweighted_edges_get_the_default_distance() {
        let topo = Topology::from_unweighted_edges([(n(0), n(1))]);
        assert_eq!(topo.symmetric_distance(n(0), n(1)), Some(DEFAULT_EDGE_DISTANCE));
    }
}
