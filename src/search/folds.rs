//! Expanding-window fold schedule.

use crate::core::{Error, Result};
use std::ops::Range;

/// Training prefix ratios, one per fold.
pub const TRAIN_RATIOS: [f64; 3] = [0.70, 0.80, 0.90];
/// Validation window ratio shared by every fold.
pub const VAL_RATIO: f64 = 0.10;

/// Folds grow the training prefix while the validation window keeps its size
/// and sits right after the prefix.
#[derive(Clone, Debug, PartialEq)]
pub struct FoldSchedule {
    pub train_ratios: Vec<f64>,
    pub val_ratio: f64,
}

impl Default for FoldSchedule {
    fn default() -> Self {
        Self {
            train_ratios: TRAIN_RATIOS.to_vec(),
            val_ratio: VAL_RATIO,
        }
    }
}

/// A concrete fold over a dataset of known size.
#[derive(Clone, Debug, PartialEq)]
pub struct Fold {
    pub index: usize,
    pub train_ratio: f64,
    pub train: Range<usize>,
    pub val: Range<usize>,
}

impl FoldSchedule {
    pub fn len(&self) -> usize {
        self.train_ratios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train_ratios.is_empty()
    }

    pub fn train_ratio(&self, index: usize) -> Result<f64> {
        self.train_ratios
            .get(index)
            .copied()
            .ok_or(Error::IndexOutOfRange {
                what: "fold",
                index,
                len: self.len(),
            })
    }

    /// `(floor(ratio * n), floor(val_ratio * n))`.
    pub fn fold_sizes(&self, train_ratio: f64, num_graphs: usize) -> (usize, usize) {
        let n = num_graphs as f64;
        (
            (train_ratio * n).floor() as usize,
            (self.val_ratio * n).floor() as usize,
        )
    }

    /// Ranges of fold `index`; `None` when train and validation together
    /// need more graphs than exist or either window floors to zero.
    pub fn fold(&self, index: usize, num_graphs: usize) -> Result<Option<Fold>> {
        let train_ratio = self.train_ratio(index)?;
        let (train_size, val_size) = self.fold_sizes(train_ratio, num_graphs);
        if train_size == 0 || val_size == 0 || train_size + val_size > num_graphs {
            return Ok(None);
        }
        Ok(Some(Fold {
            index,
            train_ratio,
            train: 0..train_size,
            val: train_size..train_size + val_size,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_for_hundred_graphs() {
        let schedule = FoldSchedule::default();
        let sizes: Vec<(usize, usize)> = schedule
            .train_ratios
            .iter()
            .map(|&r| schedule.fold_sizes(r, 100))
            .collect();
        assert_eq!(sizes, vec![(70, 10), (80, 10), (90, 10)]);
    }

    #[test]
    fn test_sizes_floor() {
        let schedule = FoldSchedule::default();
        assert_eq!(schedule.fold_sizes(0.9, 99), (89, 9));
        assert_eq!(schedule.fold_sizes(0.7, 7), (4, 0));
    }

    #[test]
    fn test_fold_ranges_are_contiguous() {
        let fold = FoldSchedule::default().fold(1, 100).unwrap().unwrap();
        assert_eq!(fold.train, 0..80);
        assert_eq!(fold.val, 80..90);
        assert_eq!(fold.train_ratio, 0.8);
    }

    #[test]
    fn test_overflow_yields_none() {
        let schedule = FoldSchedule {
            train_ratios: vec![0.95],
            val_ratio: 0.10,
        };
        assert!(schedule.fold(0, 100).unwrap().is_none());
    }

    #[test]
    fn test_empty_validation_window_yields_none() {
        let schedule = FoldSchedule::default();
        // floor(0.1 * 9) = 0
        assert_eq!(schedule.fold_sizes(0.7, 9), (6, 0));
        assert!(schedule.fold(0, 9).unwrap().is_none());
        assert!(schedule.fold(0, 10).unwrap().is_some());
    }

    #[test]
    fn test_empty_training_window_yields_none() {
        let schedule = FoldSchedule {
            train_ratios: vec![0.05],
            val_ratio: 0.5,
        };
        assert!(schedule.fold(0, 10).unwrap().is_none());
    }

    #[test]
    fn test_fold_index_out_of_range() {
        assert!(matches!(
            FoldSchedule::default().fold(3, 100),
            Err(Error::IndexOutOfRange { what: "fold", .. })
        ));
    }
}
