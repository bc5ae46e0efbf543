//! Visualization Module
//!
//! PNG line charts of predictions against ground truth, drawn directly onto
//! an `image::RgbImage`.

pub mod canvas;
pub mod predictions;

pub use canvas::{colors, Canvas, PlotConfig};
pub use predictions::{node_series, plot_prediction, plot_prediction_full, prediction_path};
