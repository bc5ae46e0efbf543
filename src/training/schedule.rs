//! Epoch budget and validation schedule.

use crate::core::{Error, Result};

/// Validation runs on every epoch divisible by this, and on the last epoch.
pub const VALIDATION_INTERVAL: usize = 5;

/// Epochs to train for a given learning rate.
///
/// Only the four rates of the search grid have a budget; anything else is a
/// configuration error.
#[allow(clippy::float_cmp)]
pub fn epoch_budget(learning_rate: f64) -> Result<usize> {
    if learning_rate == 1e-4 {
        Ok(100)
    } else if learning_rate == 5e-4 {
        Ok(80)
    } else if learning_rate == 1e-3 {
        Ok(70)
    } else if learning_rate == 5e-3 {
        Ok(50)
    } else {
        Err(Error::UnsupportedLearningRate(learning_rate))
    }
}

/// Whether `epoch` (0-based) of `total` is a validation epoch.
pub fn is_validation_epoch(epoch: usize, total: usize) -> bool {
    epoch % VALIDATION_INTERVAL == 0 || epoch + 1 == total
}

/// First, middle and last epoch, deduplicated.
pub fn attention_epochs(total: usize) -> Vec<usize> {
    if total == 0 {
        return Vec::new();
    }
    let mut epochs = vec![0, total / 2, total - 1];
    epochs.dedup();
    epochs
}
