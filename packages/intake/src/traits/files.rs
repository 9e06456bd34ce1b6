//! File store trait for uploaded source documents.

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::error::{StoreError, StoreResult};
use crate::types::input::StoredFile;

/// Store for uploaded bytes, addressed by key.
///
/// Keys are flat names (no directories). Access control over the returned
/// `public_url` belongs to the backend.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Store bytes under `key`.
    async fn put(&self, key: &str, bytes: Bytes) -> StoreResult<StoredFile>;

    /// Fetch the bytes stored under `key`.
    async fn get(&self, key: &str) -> StoreResult<Bytes>;

    /// Backend name (for logging).
    fn name(&self) -> &str {
        "unknown"
    }
}

/// Reject keys that could escape a flat namespace.
pub fn validate_key(key: &str) -> StoreResult<()> {
    if key.is_empty()
        || key == "."
        || key == ".."
        || key.contains('/')
        || key.contains('\\')
        || key.contains('\0')
    {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Lowercase hex SHA-256 of a byte slice.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("1700000000000_order.pdf").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("..").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a\\b").is_err());
    }

    #[test]
    fn test_content_hash() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
