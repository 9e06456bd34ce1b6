// HTTP routes
pub mod files;
pub mod health;
pub mod ingest;
pub mod logs;
pub mod parse;
pub mod shipments;
pub mod stats;
pub mod stream;

pub use files::*;
pub use health::*;
pub use ingest::*;
pub use logs::*;
pub use parse::*;
pub use shipments::*;
pub use stats::*;
pub use stream::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use intake::StoreError;
use serde_json::json;
use thiserror::Error;

/// Error returned by the read/update endpoints.
///
/// Rendered as `{"success": false, "error": <message>}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => Self::NotFound(e.to_string()),
            StoreError::Invalid(_) | StoreError::InvalidKey(_) => Self::BadRequest(e.to_string()),
            other => {
                tracing::error!(error = %other, "Store operation failed");
                Self::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(json!({ "success": false, "error": self.to_string() })),
        )
            .into_response()
    }
}
