//! Dataset collaborator contract.

use super::normalize::Normalization;
use crate::core::{Error, Result, TrainingConfig};
use crate::graph::{Graph, GraphSample};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Fractions of the windowed dataset assigned to train and validation;
/// test takes the remainder.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    pub train: f64,
    pub val: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.70,
            val: 0.15,
        }
    }
}

impl SplitRatios {
    /// Contiguous index ranges over `len` samples (floor arithmetic).
    pub fn split(&self, len: usize) -> Result<DatasetSplits> {
        if self.train < 0.0 || self.val < 0.0 || self.train + self.val > 1.0 {
            return Err(Error::InvalidConfig(format!(
                "split ratios {} + {} must lie in [0, 1]",
                self.train, self.val
            )));
        }
        let train_end = (self.train * len as f64).floor() as usize;
        let val_end = train_end + (self.val * len as f64).floor() as usize;
        Ok(DatasetSplits {
            train: 0..train_end,
            val: train_end..val_end,
            test: val_end..len,
        })
    }
}

/// Index ranges of the fixed train / validation / test slices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetSplits {
    pub train: Range<usize>,
    pub val: Range<usize>,
    pub test: Range<usize>,
}

/// A built dataset: topology, every windowed sample, statistics and splits.
#[derive(Clone, Debug)]
pub struct ProcessedDataset {
    pub graph: Graph,
    pub samples: Vec<GraphSample>,
    pub stats: Normalization,
    pub splits: DatasetSplits,
}

impl ProcessedDataset {
    /// Number of graphs.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Node count, taken from the topology.
    pub fn n_nodes(&self) -> usize {
        self.graph.n_nodes()
    }

    pub fn train(&self) -> &[GraphSample] {
        &self.samples[self.splits.train.clone()]
    }

    pub fn val(&self) -> &[GraphSample] {
        &self.samples[self.splits.val.clone()]
    }

    pub fn test(&self) -> &[GraphSample] {
        &self.samples[self.splits.test.clone()]
    }

    /// Copy node count and statistics into a training config.
    pub fn apply_to(&self, config: &mut TrainingConfig) {
        config.n_node = self.n_nodes();
        config.d_mean = self.stats.mean;
        config.d_std_dev = self.stats.std_dev;
    }
}

/// Anything that can turn a configuration into a graph dataset.
///
/// Implementations read `BATCH_SIZE`, `N_HIST`, `N_PRED` and
/// `USE_GAT_WEIGHTS` from the config.
pub trait DatasetSource {
    fn build(&self, config: &TrainingConfig) -> Result<ProcessedDataset>;
}
