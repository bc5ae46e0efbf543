//! Data Module
//!
//! Builds graph datasets for the forecaster:
//! - `DatasetSource`: the contract every data collaborator implements
//! - `SignalSource`: sliding windows over a recorded `(time, node)` signal
//! - `SyntheticSource`: deterministic daily-periodic signal for tests and demos
//! - `Normalization`: z-score statistics shared by every split

pub mod normalize;
pub mod signal;
pub mod source;
pub mod synthetic;

pub use normalize::Normalization;
pub use signal::SignalSource;
pub use source::{DatasetSource, DatasetSplits, ProcessedDataset, SplitRatios};
pub use synthetic::SyntheticSource;
