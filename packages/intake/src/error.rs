//! Typed errors for the intake pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match
//! on the failure kind and map it to their own surface.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Human-readable message recorded when the model output is not JSON.
pub const INVALID_FORMAT_MESSAGE: &str = "Failed to parse AI response as JSON";

/// Human-readable message recorded when required fields are absent.
pub const MISSING_FIELDS_MESSAGE: &str = "Missing required fields: customer_name and address";

/// Errors raised by record and file stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend rejected the operation
    #[error("{0}")]
    Backend(String),

    /// Row or object not found
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Attempt already reached a terminal status
    #[error("extraction attempt {id} is already resolved")]
    AlreadyResolved { id: Uuid },

    /// Attempt cannot be failed: a shipment already references it
    #[error("extraction attempt {id} already produced a shipment")]
    HasShipment { id: Uuid },

    /// Storage key rejected (empty, absolute, path traversal)
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// Record failed an invariant check before being written
    #[error("invalid record: {0}")]
    Invalid(String),

    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Errors from the external extraction model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Call failed or returned a non-success status
    #[error("{}", upstream_message(.status, .message))]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// Call exceeded the configured timeout
    #[error("request timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    /// Model is misconfigured (missing key, bad base URL)
    #[error("model configuration error: {0}")]
    Config(String),
}

fn upstream_message(status: &Option<u16>, message: &str) -> String {
    match *status {
        Some(status) if message.is_empty() => format!("upstream returned status {status}"),
        Some(status) => format!("upstream returned status {status}: {message}"),
        None => message.to_string(),
    }
}

/// Errors from the ingestion adapter.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Input could not be decoded to text
    #[error("could not read input: {0}")]
    Read(String),

    /// Upload exceeds the configured size limit
    #[error("file too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },

    /// File store rejected the write
    #[error("failed to store file: {0}")]
    Store(#[source] StoreError),
}

/// Kind of extraction failure, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    LogWrite,
    Upstream,
    InvalidFormat,
    MissingFields,
    InvalidField,
    Store,
}

/// Typed failure of a single extraction.
///
/// Every variant except [`ExtractionError::LogWrite`] carries the attempt it
/// was recorded into.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The audit attempt could not be created; nothing else ran
    #[error("failed to create extraction log: {0}")]
    LogWrite(#[source] StoreError),

    /// The model call failed, returned non-success, or timed out
    #[error("AI extraction failed: {message}")]
    Upstream { attempt_id: Uuid, message: String },

    /// Model output was not JSON
    #[error("{}", INVALID_FORMAT_MESSAGE)]
    InvalidFormat { attempt_id: Uuid },

    /// `customer_name` or `address` absent or blank
    #[error("{}", MISSING_FIELDS_MESSAGE)]
    MissingFields { attempt_id: Uuid },

    /// An optional field had the wrong shape
    #[error("Invalid field {field}: {reason}")]
    InvalidField {
        attempt_id: Uuid,
        field: &'static str,
        reason: String,
    },

    /// The shipment record could not be written
    #[error("{message}")]
    Store { attempt_id: Uuid, message: String },
}

impl ExtractionError {
    /// The failure kind.
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::LogWrite(_) => FailureReason::LogWrite,
            Self::Upstream { .. } => FailureReason::Upstream,
            Self::InvalidFormat { .. } => FailureReason::InvalidFormat,
            Self::MissingFields { .. } => FailureReason::MissingFields,
            Self::InvalidField { .. } => FailureReason::InvalidField,
            Self::Store { .. } => FailureReason::Store,
        }
    }

    /// The attempt this failure was recorded into, if one was created.
    pub fn attempt_id(&self) -> Option<Uuid> {
        match self {
            Self::LogWrite(_) => None,
            Self::Upstream { attempt_id, .. }
            | Self::InvalidFormat { attempt_id }
            | Self::MissingFields { attempt_id }
            | Self::InvalidField { attempt_id, .. }
            | Self::Store { attempt_id, .. } => Some(*attempt_id),
        }
    }
}

/// Error from the combined ingest-then-extract flow.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for model calls.
pub type ModelResult<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_messages_match_audit_text() {
        let id = Uuid::new_v4();
        assert_eq!(
            ExtractionError::InvalidFormat { attempt_id: id }.to_string(),
            "Failed to parse AI response as JSON"
        );
        assert_eq!(
            ExtractionError::MissingFields { attempt_id: id }.to_string(),
            "Missing required fields: customer_name and address"
        );
    }

    #[test]
    fn test_upstream_message_includes_status() {
        let err = ModelError::Upstream {
            status: Some(503),
            message: "overloaded".into(),
        };
        assert_eq!(err.to_string(), "upstream returned status 503: overloaded");

        let bare = ModelError::Upstream {
            status: Some(500),
            message: String::new(),
        };
        assert_eq!(bare.to_string(), "upstream returned status 500");
    }

    #[test]
    fn test_log_write_has_no_attempt() {
        let err = ExtractionError::LogWrite(StoreError::Backend("down".into()));
        assert_eq!(err.attempt_id(), None);
        assert_eq!(err.reason(), FailureReason::LogWrite);
    }
}
