//! Sliding-window dataset over a recorded signal.

use super::normalize::Normalization;
use super::source::{DatasetSource, ProcessedDataset, SplitRatios};
use crate::core::{Error, Result, TrainingConfig};
use crate::graph::{Graph, GraphSample};
use ndarray::{s, Array2};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// On-disk layout: rows are time slots, columns are nodes.
#[derive(Deserialize)]
struct SignalFile {
    signal: Vec<Vec<f32>>,
    #[serde(default)]
    adjacency: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    slots_per_day: Option<usize>,
}

/// A `(T, N)` signal plus optional `(N, N)` adjacency.
#[derive(Clone, Debug)]
pub struct SignalSource {
    signal: Array2<f32>,
    adjacency: Option<Array2<f32>>,
    slots_per_day: Option<usize>,
    ratios: SplitRatios,
}

fn to_matrix(rows: Vec<Vec<f32>>, what: &str) -> Result<Array2<f32>> {
    let n_rows = rows.len();
    let n_cols = rows.first().map(Vec::len).unwrap_or(0);
    if let Some(bad) = rows.iter().position(|r| r.len() != n_cols) {
        return Err(Error::InvalidData(format!(
            "{} row {} has {} columns, expected {}",
            what,
            bad,
            rows[bad].len(),
            n_cols
        )));
    }
    let flat: Vec<f32> = rows.into_iter().flatten().collect();
    Ok(Array2::from_shape_vec((n_rows, n_cols), flat)?)
}

impl SignalSource {
    pub fn new(signal: Array2<f32>, adjacency: Option<Array2<f32>>) -> Result<Self> {
        if signal.ncols() == 0 {
            return Err(Error::InvalidData("signal has no nodes".into()));
        }
        if let Some(adj) = &adjacency {
            let n = signal.ncols();
            if adj.dim() != (n, n) {
                return Err(Error::shape_mismatch((n, n), adj.dim()));
            }
        }
        Ok(Self {
            signal,
            adjacency,
            slots_per_day: None,
            ratios: SplitRatios::default(),
        })
    }

    /// Load `{"signal": [[..]], "adjacency": [[..]], "slots_per_day": 24}`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let file: SignalFile = serde_json::from_str(&data)?;

        let signal = to_matrix(file.signal, "signal")?;
        let adjacency = file
            .adjacency
            .map(|rows| to_matrix(rows, "adjacency"))
            .transpose()?;

        info!(
            path = %path.display(),
            slots = signal.nrows(),
            nodes = signal.ncols(),
            "loaded signal"
        );

        let mut source = Self::new(signal, adjacency)?;
        source.slots_per_day = file.slots_per_day;
        Ok(source)
    }

    pub fn with_ratios(mut self, ratios: SplitRatios) -> Self {
        self.ratios = ratios;
        self
    }

    pub fn with_slots_per_day(mut self, slots_per_day: usize) -> Self {
        self.slots_per_day = Some(slots_per_day);
        self
    }

    /// Samples per day recorded with the signal, if any.
    pub fn slots_per_day(&self) -> Option<usize> {
        self.slots_per_day
    }

    pub fn n_nodes(&self) -> usize {
        self.signal.ncols()
    }

    pub fn n_slots(&self) -> usize {
        self.signal.nrows()
    }

    fn topology(&self, use_weights: bool) -> Result<Graph> {
        match (&self.adjacency, use_weights) {
            (Some(adj), true) => Graph::from_adjacency(adj),
            _ => Ok(Graph::fully_connected(self.n_nodes())),
        }
    }
}

impl DatasetSource for SignalSource {
    fn build(&self, config: &TrainingConfig) -> Result<ProcessedDataset> {
        let (h, p) = (config.n_hist, config.n_pred);
        let window = h + p;
        let slots = self.n_slots();
        if h == 0 || p == 0 {
            return Err(Error::InvalidConfig("N_HIST and N_PRED must be positive".into()));
        }
        if slots < window {
            return Err(Error::InvalidData(format!(
                "signal has {} slots, need at least N_HIST + N_PRED = {}",
                slots, window
            )));
        }

        let n_windows = slots - window + 1;
        let splits = self.ratios.split(n_windows)?;

        // Statistics only see the rows the training windows touch.
        let stat_rows = (splits.train.end + window - 1).clamp(window, slots);
        let stats = Normalization::fit(self.signal.slice(s![..stat_rows, ..]).iter().copied());
        let normalized = self.signal.mapv(|v| stats.normalize(v));

        let samples = (0..n_windows)
            .map(|t| {
                let features = normalized.slice(s![t..t + h, ..]).t().to_owned();
                let targets = normalized.slice(s![t + h..t + window, ..]).t().to_owned();
                GraphSample::new(features, targets)
            })
            .collect::<Result<Vec<_>>>()?;

        let graph = self.topology(config.use_gat_weights)?;

        debug!(
            windows = n_windows,
            edges = graph.n_edges(),
            mean = stats.mean,
            std_dev = stats.std_dev,
            "built windowed dataset"
        );

        Ok(ProcessedDataset {
            graph,
            samples,
            stats,
            splits,
        })
    }
}
