//! Training configuration.
//!
//! Serialized with the upper-case keys used by the experiment scripts, so a
//! config file reads like `{"BATCH_SIZE": 50, "N_HIST": 12, ...}`.

use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration shared by the data pipeline, trainer and plots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct TrainingConfig {
    /// Graphs per mini-batch
    pub batch_size: usize,
    /// Epochs for a plain training run (grid search derives its own)
    pub epochs: usize,
    /// L2 penalty added to the gradient by Adam
    pub weight_decay: f64,
    /// Learning rate
    pub initial_lr: f64,
    /// Directory for run artifacts
    pub checkpoint_dir: PathBuf,
    /// Prediction horizon (P)
    pub n_pred: usize,
    /// History length (H)
    pub n_hist: usize,
    /// Dropout probability
    pub dropout: f64,
    /// Build edges from the weighted adjacency instead of a full graph
    pub use_gat_weights: bool,
    /// Node count, filled in from the dataset
    pub n_node: usize,
    /// Normalization mean, filled in from the dataset
    pub d_mean: f64,
    /// Normalization standard deviation, filled in from the dataset
    pub d_std_dev: f64,
    /// Samples per day, used to cut plots at whole days
    pub slots_per_day: usize,
    /// RNG seed for initialisation, dropout and shuffling
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            epochs: 60,
            weight_decay: 5e-5,
            initial_lr: 3e-4,
            checkpoint_dir: PathBuf::from("runs"),
            n_pred: 9,
            n_hist: 12,
            dropout: 0.2,
            use_gat_weights: true,
            n_node: 0,
            d_mean: 0.0,
            d_std_dev: 1.0,
            slots_per_day: 24,
            seed: 0,
        }
    }
}

impl TrainingConfig {
    /// Load from a JSON file; absent keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would fail later in less obvious ways.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("BATCH_SIZE must be positive".into()));
        }
        if self.n_hist == 0 || self.n_pred == 0 {
            return Err(Error::InvalidConfig(
                "N_HIST and N_PRED must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.dropout) {
            return Err(Error::InvalidConfig(format!(
                "DROPOUT must be in [0, 1], got {}",
                self.dropout
            )));
        }
        if self.initial_lr <= 0.0 || self.weight_decay < 0.0 {
            return Err(Error::InvalidConfig(
                "INITIAL_LR must be positive and WEIGHT_DECAY non-negative".into(),
            ));
        }
        if self.slots_per_day == 0 {
            return Err(Error::InvalidConfig("SLOTS_PER_DAY must be positive".into()));
        }
        Ok(())
    }
}

/// Switches for the train-or-load run pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunOptions {
    /// Train even when a saved model exists
    pub retrain: bool,
    /// Save the trained model
    pub save_model: bool,
    /// Capture and save attention matrices at the first, middle and last epoch
    pub save_attention: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            retrain: true,
            save_model: true,
            save_attention: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_case_keys() {
        let config: TrainingConfig =
            serde_json::from_str(r#"{"BATCH_SIZE": 8, "N_HIST": 24, "USE_GAT_WEIGHTS": false}"#)
                .unwrap();
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.n_hist, 24);
        assert!(!config.use_gat_weights);
        assert_eq!(config.n_pred, 9);
    }

    #[test]
    fn test_serialized_key_names() {
        let value = serde_json::to_value(TrainingConfig::default()).unwrap();
        assert!(value.get("D_STD_DEV").is_some());
        assert!(value.get("SLOTS_PER_DAY").is_some());
        assert!(value.get("INITIAL_LR").is_some());
    }

    #[test]
    fn test_validate() {
        assert!(TrainingConfig::default().validate().is_ok());

        let config = TrainingConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = TrainingConfig {
            dropout: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"EPOCHS": 3, "DROPOUT": 0.0}"#).unwrap();

        let config = TrainingConfig::from_json_file(&path).unwrap();
        assert_eq!(config.epochs, 3);
        assert_eq!(config.dropout, 0.0);
    }
}
