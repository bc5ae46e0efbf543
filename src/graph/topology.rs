//! Static graph topology.

use crate::core::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// A directed edge `src -> dst`.
///
/// `weight` records the adjacency entry the edge came from. Attention only
/// uses the topology.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub src: usize,
    pub dst: usize,
    pub weight: f32,
}

/// Fixed set of nodes and edges shared by all samples of a dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    n_nodes: usize,
    edges: Vec<Edge>,
}

impl Graph {
    /// Create a graph, checking every endpoint is a valid node.
    pub fn new(n_nodes: usize, edges: Vec<Edge>) -> Result<Self> {
        if n_nodes == 0 {
            return Err(Error::InvalidData("graph must have at least one node".into()));
        }
        if let Some(bad) = edges.iter().find(|e| e.src >= n_nodes || e.dst >= n_nodes) {
            return Err(Error::InvalidData(format!(
                "edge {} -> {} references a node outside 0..{}",
                bad.src, bad.dst, n_nodes
            )));
        }
        Ok(Self { n_nodes, edges })
    }

    /// Every node connected to every node, self loops included.
    pub fn fully_connected(n_nodes: usize) -> Self {
        let edges = (0..n_nodes)
            .flat_map(|src| (0..n_nodes).map(move |dst| Edge { src, dst, weight: 1.0 }))
            .collect();
        Self { n_nodes, edges }
    }

    /// Edges for every positive entry `adjacency[[src, dst]]`, plus self loops.
    pub fn from_adjacency(adjacency: &Array2<f32>) -> Result<Self> {
        let (rows, cols) = adjacency.dim();
        if rows != cols {
            return Err(Error::shape_mismatch((rows, rows), (rows, cols)));
        }

        let edges = adjacency
            .indexed_iter()
            .filter(|(_, &w)| w > 0.0)
            .map(|((src, dst), &weight)| Edge { src, dst, weight })
            .collect();

        Ok(Self::new(rows, edges)?.with_self_loops())
    }

    /// Add a unit-weight self loop to every node that lacks one.
    pub fn with_self_loops(mut self) -> Self {
        let mut has_loop = vec![false; self.n_nodes];
        for e in &self.edges {
            if e.src == e.dst {
                has_loop[e.src] = true;
            }
        }
        for (node, present) in has_loop.into_iter().enumerate() {
            if !present {
                self.edges.push(Edge {
                    src: node,
                    dst: node,
                    weight: 1.0,
                });
            }
        }
        self
    }

    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Number of incoming edges per node.
    pub fn in_degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.n_nodes];
        for e in &self.edges {
            degrees[e.dst] += 1;
        }
        degrees
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fully_connected() {
        let g = Graph::fully_connected(4);
        assert_eq!(g.n_nodes(), 4);
        assert_eq!(g.n_edges(), 16);
        assert!(g.in_degrees().iter().all(|&d| d == 4));
    }

    #[test]
    fn test_from_adjacency_adds_self_loops() {
        let adj = array![[0.0, 0.5, 0.0], [0.5, 0.0, 0.0], [0.0, 0.0, 0.0]];
        let g = Graph::from_adjacency(&adj).unwrap();

        assert_eq!(g.n_edges(), 5);
        assert_eq!(g.in_degrees(), vec![2, 2, 1]);
        assert!(g
            .edges()
            .iter()
            .any(|e| e.src == 0 && e.dst == 1 && (e.weight - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_existing_self_loop_kept_once() {
        let adj = array![[1.0, 0.0], [0.0, 0.0]];
        let g = Graph::from_adjacency(&adj).unwrap();
        assert_eq!(g.n_edges(), 2);
    }

    #[test]
    fn test_rejects_bad_edges() {
        let result = Graph::new(2, vec![Edge { src: 0, dst: 2, weight: 1.0 }]);
        assert!(matches!(result, Err(Error::InvalidData(_))));
        assert!(Graph::new(0, vec![]).is_err());
    }

    #[test]
    fn test_rejects_non_square_adjacency() {
        let adj = Array2::<f32>::zeros((2, 3));
        assert!(matches!(
            Graph::from_adjacency(&adj),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
