//! Graph Neural Network (GNN) Module
//!
//! The forecasting network and its building blocks:
//! - Averaged multi-head graph attention (`AveragedGatConv`)
//! - LSTM with back-propagation through time (`Lstm`)
//! - Linear projection (`Linear`)
//! - The composed spatio-temporal model (`StGat`)

pub mod attention;
pub mod init;
pub mod linear;
pub mod lstm;
pub mod model;

pub use attention::{AveragedGatConv, GatParams, NUM_HEADS};
pub use init::Parameterized;
pub use linear::{Linear, LinearParams};
pub use lstm::{Lstm, LstmParams};
pub use model::{Forecast, ForwardCache, Gradients, ModelSpec, StGat, LSTM1_HIDDEN, LSTM2_HIDDEN};
