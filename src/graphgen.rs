//! Synthetic topology generators for the CLI run harness.
//!
//! Not a general-purpose graph library: these three constructors cover
//! exactly the graph families the original network generator implements
//! (Erdos-Renyi, Barabasi-Albert, Watts-Strogatz), each retried until the
//! result is connected, matching that generator's own accept/reject loop.
//! A fourth family, random-geometric, is named in [`crate::config::GraphType`]
//! but was never actually implemented upstream either — [`SimulationConfig`]
//! rejects it at validation time rather than silently falling back to
//! something else.

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::node_id::NodeId;

/// Upper bound on rewiring attempts for Watts-Strogatz before giving up,
/// mirroring the `tries=100000` cap passed to the original generator.
const MAX_CONNECT_ATTEMPTS: u32 = 100_000;

fn is_connected(num_vertices: usize, edges: &[(usize, usize)]) -> bool {
    if num_vertices == 0 {
        return true;
    }
    let mut adjacency = vec![Vec::new(); num_vertices];
    for &(i, j) in edges {
        adjacency[i].push(j);
        adjacency[j].push(i);
    }

    let mut visited = vec![false; num_vertices];
    let mut stack = vec![0usize];
    visited[0] = true;
    let mut seen = 1;
    while let Some(v) = stack.pop() {
        for &w in &adjacency[v] {
            if !visited[w] {
                visited[w] = true;
                seen += 1;
                stack.push(w);
            }
        }
    }
    seen == num_vertices
}

fn to_node_edges(edges: Vec<(usize, usize)>) -> Vec<(NodeId, NodeId)> {
    edges.into_iter().map(|(i, j)| (NodeId::new(i as u32), NodeId::new(j as u32))).collect()
}

/// Keep adding random edges between distinct vertices until the graph is
/// connected.
pub fn erdos_renyi(num_vertices: usize, rng: &mut impl Rng) -> Vec<(NodeId, NodeId)> {
    let mut edges = Vec::new();
    if num_vertices <= 1 {
        return Vec::new();
    }
    while !is_connected(num_vertices, &edges) {
        let i = rng.gen_range(0..num_vertices);
        let j = rng.gen_range(0..num_vertices);
        if i != j {
            edges.push((i, j));
        }
    }
    to_node_edges(edges)
}

/// Degree-proportional preferential attachment: each candidate edge favors
/// vertices that already have more connections, `degree + 1` smoothed over
/// the full vertex count so isolated vertices still have a chance.
pub fn barabasi_albert(num_vertices: usize, rng: &mut impl Rng) -> Vec<(NodeId, NodeId)> {
    let mut edges: Vec<(usize, usize)> = Vec::new();
    if num_vertices <= 1 {
        return Vec::new();
    }
    while !is_connected(num_vertices, &edges) {
        let probabilities = attachment_probabilities(num_vertices, &edges);
        let i = weighted_pick(&probabilities, rng);
        let j = weighted_pick(&probabilities, rng);
        if i != j {
            edges.push((i, j));
        }
    }
    to_node_edges(edges)
}

fn attachment_probabilities(num_vertices: usize, edges: &[(usize, usize)]) -> Vec<f64> {
    let mut degrees = vec![0u32; num_vertices];
    for &(i, j) in edges {
        degrees[i] += 1;
        degrees[j] += 1;
    }
    let total: u32 = degrees.iter().map(|&d| d + 1).sum();
    let denom = (total + num_vertices as u32) as f64;
    degrees.iter().map(|&d| (d as f64 + 2.0) / denom).collect()
}

fn weighted_pick(probabilities: &[f64], rng: &mut impl Rng) -> usize {
    WeightedIndex::new(probabilities).expect("at least one positive weight").sample(rng)
}

/// Ring lattice joined to `nearest_neighbors` closest vertices on each side,
/// then each edge independently rewired with `rewiring_probability`, retried
/// on disconnection like the original's `tries=100000` guard.
pub fn watts_strogatz(num_vertices: usize, nearest_neighbors: usize, rewiring_probability: f64, rng: &mut impl Rng) -> Vec<(NodeId, NodeId)> {
    if num_vertices <= 1 {
        return Vec::new();
    }
    for _ in 0..MAX_CONNECT_ATTEMPTS {
        let edges = ring_lattice_rewired(num_vertices, nearest_neighbors, rewiring_probability, rng);
        if is_connected(num_vertices, &edges) {
            return to_node_edges(edges);
        }
    }
    // Fall back to a plain ring so the caller always gets a connected graph.
    ring_lattice_rewired(num_vertices, nearest_neighbors, 0.0, rng)
        .into_iter()
        .map(|(i, j)| (NodeId::new(i as u32), NodeId::new(j as u32)))
        .collect()
}

fn ring_lattice_rewired(num_vertices: usize, nearest_neighbors: usize, rewiring_probability: f64, rng: &mut impl Rng) -> Vec<(usize, usize)> {
    let k = nearest_neighbors.max(1).min(num_vertices.saturating_sub(1));
    let mut edges = Vec::new();
    for i in 0..num_vertices {
        for step in 1..=k / 2 + k % 2 {
            let mut j = (i + step) % num_vertices;
            if rng.gen::<f64>() < rewiring_probability {
                let mut candidates: Vec<usize> = (0..num_vertices).filter(|&v| v != i).collect();
                candidates.shuffle(rng);
                if let Some(&picked) = candidates.first() {
                    j = picked;
                }
            }
            if i != j && !edges.contains(&(i, j)) && !edges.contains(&(j, i)) {
                edges.push((i, j));
            }
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn erdos_renyi_produces_connected_graph() {
        let mut rng = StdRng::seed_from_u64(1);
        let edges = erdos_renyi(10, &mut rng);
        let idx_edges: Vec<(usize, usize)> = edges.iter().map(|(a, b)| (a.value() as usize, b.value() as usize)).collect();
        assert!(is_connected(10, &idx_edges));
    }

    #[test]
    fn barabasi_albert_produces_connected_graph() {
        let mut rng = StdRng::seed_from_u64(2);
        let edges = barabasi_albert(12, &mut rng);
        let idx_edges: Vec<(usize, usize)> = edges.iter().map(|(a, b)| (a.value() as usize, b.value() as usize)).collect();
        assert!(is_connected(12, &idx_edges));
    }

    #[test]
    fn watts_strogatz_produces_connected_graph() {
        let mut rng = StdRng::seed_from_u64(3);
        let edges = watts_strogatz(16, 4, 0.1, &mut rng);
        let idx_edges: Vec<(usize, usize)> = edges.iter().map(|(a, b)| (a.value() as usize, b.value() as usize)).collect();
        assert!(is_connected(16, &idx_edges));
    }

    #[test]
    fn single_vertex_graphs_have_no_edges() {
        let mut rng = StdRng::seed_from_u64(4);
        assert!(erdos_renyi(1, &mut rng).is_empty());
        assert!(barabasi_albert(1, &mut rng).is_empty());
        assert!(watts_strogatz(1, 4, 0.1, &mut rng).is_empty());
    }
}
