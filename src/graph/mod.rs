//! Graph Module
//!
//! Fixed-topology graphs and mini-batching:
//! - `Graph`: the static node/edge structure shared by every sample
//! - `GraphSample`: per-node history and target windows
//! - `GraphBatch`: block-diagonal union of several samples
//! - `BatchLoader`: iterates a slice of samples in mini-batches

pub mod batch;
pub mod loader;
pub mod topology;

pub use batch::{GraphBatch, GraphSample};
pub use loader::BatchLoader;
pub use topology::{Edge, Graph};
