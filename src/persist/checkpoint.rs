//! Model checkpoints.
//!
//! A checkpoint stores the bincode-encoded model next to its architecture
//! key and a SHA3-256 digest of the encoded bytes. Loading fails when the
//! digest does not match or the stored architecture differs from the one
//! the caller expects.

use super::attention::{load_attention, AttentionSnapshot};
use crate::core::{now, Error, Hash256, Result, Timestamp};
use crate::gnn::{ModelSpec, StGat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Bumped whenever the encoded layout of [`StGat`] changes.
pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelCheckpoint {
    pub format_version: u32,
    pub spec: ModelSpec,
    pub digest: Hash256,
    pub saved_at: Timestamp,
    pub payload: Vec<u8>,
}

impl ModelCheckpoint {
    pub fn from_model(model: &StGat) -> Result<Self> {
        let payload = bincode::serialize(model)?;
        Ok(Self {
            format_version: CHECKPOINT_FORMAT_VERSION,
            spec: *model.spec(),
            digest: Hash256::digest(&payload),
            saved_at: now(),
            payload,
        })
    }

    /// Check the digest of the payload.
    pub fn verify(&self) -> Result<()> {
        if self.digest.matches(&self.payload) {
            return Ok(());
        }
        Err(Error::CheckpointCorrupted {
            expected: self.digest.to_hex(),
            actual: Hash256::digest(&self.payload).to_hex(),
        })
    }

    /// Decode the model, checking version, integrity and architecture.
    pub fn into_model(self, expected: &ModelSpec) -> Result<StGat> {
        if self.format_version != CHECKPOINT_FORMAT_VERSION {
            return Err(Error::CheckpointMismatch(format!(
                "format version {} (expected {})",
                self.format_version, CHECKPOINT_FORMAT_VERSION
            )));
        }
        self.verify()?;
        if &self.spec != expected {
            return Err(Error::CheckpointMismatch(format!(
                "stored {:?}, expected {:?}",
                self.spec, expected
            )));
        }

        let model: StGat = bincode::deserialize(&self.payload)
            .map_err(|e| Error::DeserializationError(e.to_string()))?;
        if model.spec() != expected {
            return Err(Error::CheckpointMismatch(format!(
                "payload holds {:?}",
                model.spec()
            )));
        }
        Ok(model)
    }
}

pub fn save_model(model: &StGat, path: impl AsRef<Path>) -> Result<()> {
    let checkpoint = ModelCheckpoint::from_model(model)?;
    let bytes = bincode::serialize(&checkpoint)?;
    std::fs::write(path.as_ref(), bytes)?;
    info!(
        path = %path.as_ref().display(),
        digest = %checkpoint.digest,
        "saved model"
    );
    Ok(())
}

pub fn load_model(path: impl AsRef<Path>, expected: &ModelSpec) -> Result<StGat> {
    let bytes = std::fs::read(path.as_ref())?;
    let checkpoint: ModelCheckpoint = bincode::deserialize(&bytes)
        .map_err(|e| Error::DeserializationError(e.to_string()))?;
    debug!(saved_at = %checkpoint.saved_at, digest = %checkpoint.digest, "read checkpoint");
    checkpoint.into_model(expected)
}

/// Previously saved model and attention, if both files exist.
///
/// `Ok(None)` means the caller should train; a present but unreadable or
/// mismatching file is an error.
pub fn load_pretrained(
    model_path: impl AsRef<Path>,
    attn_path: impl AsRef<Path>,
    spec: &ModelSpec,
) -> Result<Option<(StGat, Vec<AttentionSnapshot>)>> {
    let (model_path, attn_path) = (model_path.as_ref(), attn_path.as_ref());
    if !model_path.exists() || !attn_path.exists() {
        return Ok(None);
    }

    info!(path = %model_path.display(), "loading saved model instead of training");
    let model = load_model(model_path, spec)?;
    let attention = load_attention(attn_path)?;
    Ok(Some((model, attention)))
}
