//! Monitoring Module
//!
//! Logging setup for training runs and grid-search trials.

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
