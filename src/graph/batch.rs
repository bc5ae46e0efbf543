//! Graph samples and block-diagonal batches.

use super::topology::Graph;
use crate::core::{Error, Result};
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

/// One graph snapshot: an `H`-long history and a `P`-long target per node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphSample {
    /// Node features, shape `(N, H)`
    pub features: Array2<f32>,
    /// Node targets, shape `(N, P)`
    pub targets: Array2<f32>,
}

impl GraphSample {
    pub fn new(features: Array2<f32>, targets: Array2<f32>) -> Result<Self> {
        if features.nrows() != targets.nrows() {
            return Err(Error::shape_mismatch(features.nrows(), targets.nrows()));
        }
        Ok(Self { features, targets })
    }

    pub fn n_nodes(&self) -> usize {
        self.features.nrows()
    }

    pub fn history_len(&self) -> usize {
        self.features.ncols()
    }

    pub fn horizon(&self) -> usize {
        self.targets.ncols()
    }
}

/// `B` samples merged into one graph of `B * N` nodes.
///
/// Node `n` of sample `b` becomes node `b * N + n`; edges are copied per
/// sample with the same offset, so samples never exchange messages.
#[derive(Clone, Debug)]
pub struct GraphBatch {
    batch_size: usize,
    n_nodes: usize,
    /// Stacked features, shape `(B * N, H)`
    pub features: Array2<f32>,
    /// Stacked targets, shape `(B * N, P)`
    pub targets: Array2<f32>,
    edges: Vec<(usize, usize)>,
    incoming: Vec<Vec<usize>>,
}

impl GraphBatch {
    /// Collate samples that share `graph`'s topology.
    pub fn collate(graph: &Graph, samples: &[&GraphSample]) -> Result<Self> {
        let first = samples
            .first()
            .ok_or_else(|| Error::InvalidData("cannot batch zero samples".into()))?;

        let n = graph.n_nodes();
        let (h, p) = (first.history_len(), first.horizon());
        let b = samples.len();

        let mut features = Array2::zeros((b * n, h));
        let mut targets = Array2::zeros((b * n, p));

        for (i, sample) in samples.iter().enumerate() {
            if sample.features.dim() != (n, h) {
                return Err(Error::shape_mismatch((n, h), sample.features.dim()));
            }
            if sample.targets.dim() != (n, p) {
                return Err(Error::shape_mismatch((n, p), sample.targets.dim()));
            }
            let rows = i * n..(i + 1) * n;
            features.slice_mut(s![rows.clone(), ..]).assign(&sample.features);
            targets.slice_mut(s![rows, ..]).assign(&sample.targets);
        }

        let mut edges = Vec::with_capacity(b * graph.n_edges());
        for i in 0..b {
            let offset = i * n;
            edges.extend(graph.edges().iter().map(|e| (e.src + offset, e.dst + offset)));
        }

        let mut incoming = vec![Vec::new(); b * n];
        for (idx, &(_, dst)) in edges.iter().enumerate() {
            incoming[dst].push(idx);
        }

        Ok(Self {
            batch_size: b,
            n_nodes: n,
            features,
            targets,
            edges,
            incoming,
        })
    }

    /// Number of graphs in the batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Nodes per graph.
    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    /// Total nodes, `B * N`.
    pub fn total_nodes(&self) -> usize {
        self.batch_size * self.n_nodes
    }

    /// `(src, dst)` pairs over the merged node ids.
    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    /// Edge ids arriving at each merged node.
    pub fn incoming(&self) -> &[Vec<usize>] {
        &self.incoming
    }
}
