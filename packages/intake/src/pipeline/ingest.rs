//! Ingestion adapter - turn an upload or pasted text into one text payload.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::error::IngestError;
use crate::traits::files::FileStore;
use crate::types::{
    config::IngestConfig,
    input::{IngestInput, NormalizedInput},
};

/// Name used when an upload arrives without a usable file name.
const FALLBACK_NAME: &str = "upload";

/// Normalizes raw input and stores uploaded bytes.
#[derive(Clone)]
pub struct Ingestor {
    files: Arc<dyn FileStore>,
    config: IngestConfig,
}

impl Ingestor {
    pub fn new(files: Arc<dyn FileStore>, config: IngestConfig) -> Self {
        Self { files, config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Normalize an input.
    ///
    /// Files are decoded before they are stored, so unreadable uploads never
    /// reach the file store. Pasted text never touches it at all.
    #[instrument(skip(self, input))]
    pub async fn ingest(&self, input: IngestInput) -> Result<NormalizedInput, IngestError> {
        match input {
            IngestInput::Text { content } => self.ingest_text(content),
            IngestInput::File { bytes, name } => {
                if bytes.len() > self.config.max_file_bytes {
                    return Err(IngestError::TooLarge {
                        size: bytes.len(),
                        limit: self.config.max_file_bytes,
                    });
                }

                let text = decode_text(&bytes)?;
                let key = storage_key(Utc::now(), &name);
                let stored = self
                    .files
                    .put(&key, bytes)
                    .await
                    .map_err(IngestError::Store)?;

                info!(
                    key = %stored.key,
                    size_bytes = stored.size_bytes,
                    backend = self.files.name(),
                    "Stored uploaded file"
                );

                let file_name = if name.trim().is_empty() {
                    FALLBACK_NAME.to_string()
                } else {
                    name
                };

                Ok(NormalizedInput {
                    text,
                    file_url: Some(stored.public_url),
                    file_name,
                    content_hash: Some(stored.content_hash),
                })
            }
        }
    }

    fn ingest_text(&self, content: String) -> Result<NormalizedInput, IngestError> {
        if content.trim().is_empty() {
            return Err(IngestError::Read("pasted text is empty".into()));
        }

        let file_name = format!(
            "{}_{}.txt",
            self.config.text_name_prefix,
            Utc::now().timestamp_millis()
        );
        debug!(file_name = %file_name, chars = content.len(), "Ingested pasted text");

        Ok(NormalizedInput {
            text: content,
            file_url: None,
            file_name,
            content_hash: None,
        })
    }
}

/// Decode uploaded bytes as UTF-8.
///
/// A leading byte-order mark is dropped and invalid sequences are replaced,
/// so non-text formats pass through best-effort. Blank results are rejected.
pub fn decode_text(bytes: &[u8]) -> Result<String, IngestError> {
    if bytes.is_empty() {
        return Err(IngestError::Read("file is empty".into()));
    }

    let decoded = String::from_utf8_lossy(bytes);
    let text = decoded.strip_prefix('\u{feff}').unwrap_or(&*decoded);

    if text.trim().is_empty() {
        return Err(IngestError::Read("file contains no readable text".into()));
    }
    Ok(text.to_string())
}

/// Storage key for an upload: `{unix_millis}_{sanitized_name}`.
pub fn storage_key(now: DateTime<Utc>, name: &str) -> String {
    format!("{}_{}", now.timestamp_millis(), sanitize_file_name(name))
}

/// Replace anything outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return FALLBACK_NAME.to_string();
    }
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_storage_key() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(storage_key(now, "order.pdf"), "1700000000123_order.pdf");
        assert_eq!(
            storage_key(now, "../../etc/passwd"),
            "1700000000123_.._.._etc_passwd"
        );
        assert_eq!(storage_key(now, "   "), "1700000000123_upload");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Order #42 (final).txt"), "Order__42__final_.txt");
        assert_eq!(sanitize_file_name("naïve.csv"), "na_ve.csv");
        assert_eq!(sanitize_file_name("a\\b/c"), "a_b_c");
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(decode_text("\u{feff}hello".as_bytes()).unwrap(), "hello");
        assert_eq!(decode_text(b"ok \xff bytes").unwrap(), "ok \u{fffd} bytes");
        assert!(matches!(decode_text(b""), Err(IngestError::Read(_))));
        assert!(matches!(decode_text(b" \n\t "), Err(IngestError::Read(_))));
    }
}
