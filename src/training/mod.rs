//! Training Module
//!
//! Optimisation and evaluation of the forecaster:
//! - Adam with L2 weight decay
//! - MSE loss and MAE / RMSE / MAPE metrics
//! - Learning-rate dependent epoch budget and validation schedule
//! - Epoch loop, evaluation and the full fit routine

pub mod loss;
pub mod optimizer;
pub mod schedule;
pub mod trainer;

pub use loss::{mae, mape, mse, rmse};
pub use optimizer::{Adam, AdamConfig};
pub use schedule::{attention_epochs, epoch_budget, is_validation_epoch, VALIDATION_INTERVAL};
pub use trainer::{evaluate, fit, model_train, train_epoch, EvalReport, FitOptions, FitOutcome, TrainedModel};
