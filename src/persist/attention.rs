//! Captured attention matrices.

use crate::core::{Error, Result};
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Edge attention of one training batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttentionSnapshot {
    pub epoch: usize,
    /// Batch index within the epoch
    pub batch: usize,
    /// `(E, heads)`
    pub weights: Array2<f32>,
}

/// Serialize and LZ4-compress a list of snapshots.
pub fn encode_attention(snapshots: &[AttentionSnapshot]) -> Result<Vec<u8>> {
    let raw = bincode::serialize(snapshots)?;
    Ok(compress_prepend_size(&raw))
}

/// Inverse of [`encode_attention`].
pub fn decode_attention(bytes: &[u8]) -> Result<Vec<AttentionSnapshot>> {
    let raw = decompress_size_prepended(bytes)
        .map_err(|e| Error::DecompressionFailed(e.to_string()))?;
    bincode::deserialize(&raw).map_err(|e| Error::DeserializationError(e.to_string()))
}

pub fn save_attention(path: impl AsRef<Path>, snapshots: &[AttentionSnapshot]) -> Result<()> {
    let bytes = encode_attention(snapshots)?;
    std::fs::write(path.as_ref(), &bytes)?;
    debug!(
        path = %path.as_ref().display(),
        snapshots = snapshots.len(),
        bytes = bytes.len(),
        "saved attention"
    );
    Ok(())
}

pub fn load_attention(path: impl AsRef<Path>) -> Result<Vec<AttentionSnapshot>> {
    let bytes = std::fs::read(path)?;
    decode_attention(&bytes)
}
