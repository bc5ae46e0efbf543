//! Shared value types: content digests and timestamps.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

/// SHA3-256 digest of a byte payload, used to detect corrupted checkpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash256([u8; 32]);

impl Hash256 {
    pub fn digest(data: &[u8]) -> Self {
        Self(Sha3_256::digest(data).into())
    }

    /// Whether `data` hashes to this digest.
    pub fn matches(&self, data: &[u8]) -> bool {
        Self::digest(data) == *self
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

pub type Timestamp = chrono::DateTime<chrono::Utc>;

pub fn now() -> Timestamp {
    chrono::Utc::now()
}

/// Local wall-clock time formatted like `2025-03-01 14:02:11.512345`.
pub fn completion_time() -> String {
    chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S%.6f")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_stable_and_input_sensitive() {
        assert_eq!(Hash256::digest(b"a"), Hash256::digest(b"a"));
        assert_ne!(Hash256::digest(b"a"), Hash256::digest(b"b"));
        assert!(Hash256::digest(b"weights").matches(b"weights"));
        assert!(!Hash256::digest(b"weights").matches(b"weightz"));
    }

    #[test]
    fn test_hex_form() {
        // SHA3-256 of the empty string
        assert_eq!(
            Hash256::digest(b"").to_hex(),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
        assert_eq!(format!("{}", Hash256::digest(b"x")).len(), 64);
    }

    #[test]
    fn test_completion_time_shape() {
        let t = completion_time();
        // "YYYY-MM-DD HH:MM:SS.ffffff"
        assert_eq!(t.len(), 26);
        assert_eq!(&t[10..11], " ");
    }
}
