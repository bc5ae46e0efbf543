//! Persistence Module
//!
//! On-disk formats for trained artefacts:
//! - Model checkpoints (bincode, SHA3-256 integrity digest, architecture key)
//! - Attention captures (bincode, LZ4-compressed)

pub mod attention;
pub mod checkpoint;

pub use attention::{decode_attention, encode_attention, load_attention, save_attention, AttentionSnapshot};
pub use checkpoint::{load_model, load_pretrained, save_model, ModelCheckpoint, CHECKPOINT_FORMAT_VERSION};
