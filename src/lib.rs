//! # stgat - Spatio-Temporal Graph Attention forecasting
//!
//! Forecasts a scalar signal at every node of a fixed graph over several
//! future time steps, and searches hyperparameters with expanding-window
//! validation:
//! - **gnn**: averaged multi-head graph attention, two LSTMs, linear head
//! - **training**: Adam, epoch budget per learning rate, evaluation metrics
//! - **search**: grid enumeration, fold schedule, results logs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stgat::core::TrainingConfig;
//! use stgat::data::{DatasetSource, SyntheticSource};
//! use stgat::training::model_train;
//!
//! let mut config = TrainingConfig::default();
//! let dataset = SyntheticSource::default().build(&config).unwrap();
//! dataset.apply_to(&mut config);
//!
//! let trained = model_train(&dataset, &config, &[]).unwrap();
//! println!("final validation MAE: {:?}", trained.outcome.val_mae);
//! ```

pub mod core;
pub mod data;
pub mod gnn;
pub mod graph;
pub mod monitoring;
pub mod persist;
pub mod pipeline;
pub mod search;
pub mod training;
pub mod viz;

pub use core::error::{Error, Result};
