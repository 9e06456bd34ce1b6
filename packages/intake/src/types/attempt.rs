//! Extraction attempts - the audit trail of every model call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ParseStatusError;
use crate::error::{StoreError, StoreResult};

/// Lifecycle status of an extraction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    /// Created, model call not yet resolved
    Processing,
    /// Shipment record written
    Success,
    /// Terminal failure, see `error_message`
    Failed,
}

impl AttemptStatus {
    pub const ALL: [AttemptStatus; 3] = [Self::Processing, Self::Success, Self::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Success and failed attempts never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttemptStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(ParseStatusError::new("attempt", other)),
        }
    }
}

/// One audit record of a single extraction call (`parsing_logs` row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionAttempt {
    pub id: Uuid,

    /// Original or synthetic name of the source document
    pub file_name: String,

    /// Retrievable reference to the stored source, if any
    pub file_url: Option<String>,

    pub status: AttemptStatus,

    pub error_message: Option<String>,

    /// Raw model payload snapshot, possibly invalid
    pub extracted_data: Option<serde_json::Value>,

    pub created_at: DateTime<Utc>,
}

impl ExtractionAttempt {
    /// Start a new attempt in `processing`.
    pub fn new(file_name: impl Into<String>, file_url: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            file_url,
            status: AttemptStatus::Processing,
            error_message: None,
            extracted_data: None,
            created_at: Utc::now(),
        }
    }

    /// Apply the one allowed resolution.
    ///
    /// Fails with [`StoreError::AlreadyResolved`] if the attempt is terminal;
    /// the attempt is left untouched in that case.
    pub fn resolve(&mut self, resolution: AttemptResolution) -> StoreResult<()> {
        if self.status.is_terminal() {
            return Err(StoreError::AlreadyResolved { id: self.id });
        }
        self.status = resolution.status;
        self.error_message = resolution.error_message;
        self.extracted_data = resolution.extracted_data;
        Ok(())
    }
}

/// The terminal update applied to an attempt.
///
/// Only constructible as success or failed, so an attempt can never be
/// "resolved" back into `processing`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptResolution {
    status: AttemptStatus,
    error_message: Option<String>,
    extracted_data: Option<serde_json::Value>,
}

impl AttemptResolution {
    pub fn success(extracted_data: serde_json::Value) -> Self {
        Self {
            status: AttemptStatus::Success,
            error_message: None,
            extracted_data: Some(extracted_data),
        }
    }

    pub fn failed(message: impl Into<String>, extracted_data: Option<serde_json::Value>) -> Self {
        Self {
            status: AttemptStatus::Failed,
            error_message: Some(message.into()),
            extracted_data,
        }
    }

    pub fn status(&self) -> AttemptStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn extracted_data(&self) -> Option<&serde_json::Value> {
        self.extracted_data.as_ref()
    }
}

/// Filter for listing attempts, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttemptFilter {
    pub status: Option<AttemptStatus>,

    /// Only attempts created strictly before this instant
    pub created_before: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl AttemptFilter {
    pub fn with_status(mut self, status: AttemptStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_created_before(mut self, cutoff: DateTime<Utc>) -> Self {
        self.created_before = Some(cutoff);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, attempt: &ExtractionAttempt) -> bool {
        self.status.map_or(true, |s| s == attempt.status)
            && self.created_before.map_or(true, |c| attempt.created_at < c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_once() {
        let mut attempt = ExtractionAttempt::new("order.txt", None);
        attempt
            .resolve(AttemptResolution::success(json!({"customer_name": "Jane"})))
            .unwrap();
        assert_eq!(attempt.status, AttemptStatus::Success);

        let err = attempt
            .resolve(AttemptResolution::failed("late", None))
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyResolved { .. }));
        assert_eq!(attempt.status, AttemptStatus::Success);
        assert_eq!(attempt.error_message, None);
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in AttemptStatus::ALL {
            assert_eq!(status.as_str().parse::<AttemptStatus>().unwrap(), status);
        }
        assert!("done".parse::<AttemptStatus>().is_err());
    }
}
