//! Error types for the forecaster.

use thiserror::Error;

/// Result type alias for forecaster operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building data, training or searching.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No epoch budget defined for learning rate {0}")]
    UnsupportedLearningRate(f64),

    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    // Data errors
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Node {0} has zero in-degree")]
    ZeroInDegree(usize),

    // Persistence errors
    #[error("Checkpoint integrity check failed: expected {expected}, got {actual}")]
    CheckpointCorrupted { expected: String, actual: String },

    #[error("Checkpoint does not match model: {0}")]
    CheckpointMismatch(String),

    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    // Rendering errors
    #[error("Render error: {0}")]
    Render(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a shape mismatch from anything debug-printable.
    pub fn shape_mismatch(expected: impl std::fmt::Debug, actual: impl std::fmt::Debug) -> Self {
        Error::ShapeMismatch {
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            Error::DeserializationError(err.to_string())
        } else {
            Error::SerializationError(err.to_string())
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for Error {
    fn from(err: ndarray::ShapeError) -> Self {
        Error::ShapeMismatch {
            expected: "compatible shape".to_string(),
            actual: err.to_string(),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Render(err.to_string())
    }
}
