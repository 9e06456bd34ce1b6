//! Ingestion inputs and outputs.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Raw input to the ingestion adapter.
#[derive(Debug, Clone)]
pub enum IngestInput {
    /// Uploaded document bytes and their original name
    File { bytes: Bytes, name: String },

    /// Pasted text (e.g. an email body)
    Text { content: String },
}

impl IngestInput {
    pub fn file(bytes: impl Into<Bytes>, name: impl Into<String>) -> Self {
        Self::File {
            bytes: bytes.into(),
            name: name.into(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }
}

/// Single text payload handed to the extraction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedInput {
    pub text: String,

    /// Reference to the stored source; `None` for pasted text
    pub file_url: Option<String>,

    /// Original upload name, or a synthetic one for pasted text
    pub file_name: String,

    /// SHA-256 of the stored bytes
    pub content_hash: Option<String>,
}

/// Result of a file store write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Key the bytes were stored under
    pub key: String,

    /// Backend-specific location (bucket path, filesystem path)
    pub path: String,

    /// Retrievable reference handed to downstream records
    pub public_url: String,

    pub size_bytes: u64,

    /// Lowercase hex SHA-256 of the bytes
    pub content_hash: String,
}
