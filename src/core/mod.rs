//! Core utilities and common types for the forecaster.

pub mod config;
pub mod error;
pub mod types;

pub use config::{RunOptions, TrainingConfig};
pub use error::{Error, Result};
pub use types::*;
