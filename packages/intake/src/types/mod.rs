//! Data types for the intake pipeline.

pub mod attempt;
pub mod config;
pub mod input;
pub mod shipment;

use thiserror::Error;

/// Unknown status string read from storage or a request.
#[derive(Debug, Clone, Error)]
#[error("unknown {kind} status: {value}")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

impl ParseStatusError {
    pub(crate) fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
