//! Hyperparameter grid.

use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Candidate values per hyperparameter.
///
/// Combinations are enumerated in key order `N_HIST, N_PRED, DROPOUT,
/// INITIAL_LR, WEIGHT_DECAY` with the last key varying fastest, so an index
/// names the same combination in every process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ParamGrid {
    pub n_hist: Vec<usize>,
    pub n_pred: Vec<usize>,
    pub dropout: Vec<f64>,
    pub initial_lr: Vec<f64>,
    pub weight_decay: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_hist: vec![12, 24],
            n_pred: vec![9],
            dropout: vec![0.2, 0.5],
            initial_lr: vec![1e-4, 5e-4, 1e-3, 5e-3],
            weight_decay: vec![5e-5, 1e-4],
        }
    }
}

/// One point of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct HyperParams {
    pub n_hist: usize,
    pub n_pred: usize,
    pub dropout: f64,
    pub initial_lr: f64,
    pub weight_decay: f64,
}

impl ParamGrid {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let grid: Self = serde_json::from_str(&text)?;
        Ok(grid)
    }

    fn axis_lens(&self) -> [usize; 5] {
        [
            self.n_hist.len(),
            self.n_pred.len(),
            self.dropout.len(),
            self.initial_lr.len(),
            self.weight_decay.len(),
        ]
    }

    /// Number of combinations.
    pub fn len(&self) -> usize {
        self.axis_lens().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The combination at `index` of the Cartesian product.
    pub fn combination(&self, index: usize) -> Result<HyperParams> {
        let len = self.len();
        if len == 0 {
            return Err(Error::InvalidConfig("hyperparameter grid is empty".into()));
        }
        if index >= len {
            return Err(Error::IndexOutOfRange {
                what: "parameter",
                index,
                len,
            });
        }

        // mixed-radix digits, last axis least significant
        let mut digits = [0usize; 5];
        let mut rest = index;
        for (digit, radix) in digits.iter_mut().zip(self.axis_lens()).rev() {
            *digit = rest % radix;
            rest /= radix;
        }

        Ok(HyperParams {
            n_hist: self.n_hist[digits[0]],
            n_pred: self.n_pred[digits[1]],
            dropout: self.dropout[digits[2]],
            initial_lr: self.initial_lr[digits[3]],
            weight_decay: self.weight_decay[digits[4]],
        })
    }

    /// Every combination in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = HyperParams> + '_ {
        (0..self.len()).filter_map(move |i| self.combination(i).ok())
    }
}
