//! POST /api/parse-document
//!
//! Thin passthrough over the extraction service: the caller has already
//! read the document and sends its text.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    Json,
};
use intake::{ExtractionError, ShipmentRecord};
use serde::{Deserialize, Serialize};

use crate::server::app::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseDocumentRequest {
    pub file_content: String,
    pub file_name: String,
    #[serde(default)]
    pub file_url: Option<String>,
}

/// `{success, shipmentOrder}` or `{success, error}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseDocumentResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipment_order: Option<ShipmentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ParseDocumentResponse {
    pub fn parsed(record: ShipmentRecord) -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self {
                success: true,
                shipment_order: Some(record),
                error: None,
            }),
        )
    }

    pub fn failed(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                success: false,
                shipment_order: None,
                error: Some(error.into()),
            }),
        )
    }
}

/// Parse a document's text into a shipment.
///
/// Extraction runs in its own task so a dropped connection cannot cancel it
/// between the model call and the attempt resolution.
pub async fn parse_document_handler(
    Extension(state): Extension<AppState>,
    body: Result<Json<ParseDocumentRequest>, JsonRejection>,
) -> (StatusCode, Json<ParseDocumentResponse>) {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return ParseDocumentResponse::failed(StatusCode::BAD_REQUEST, rejection.body_text())
        }
    };

    let extractor = state.extractor().clone();
    let task = tokio::spawn(async move {
        extractor
            .extract(
                &request.file_content,
                &request.file_name,
                request.file_url.as_deref(),
            )
            .await
    });

    match task.await {
        Ok(result) => extraction_response(result),
        Err(e) => {
            tracing::error!(error = %e, "Extraction task panicked");
            ParseDocumentResponse::failed(StatusCode::INTERNAL_SERVER_ERROR, "extraction task failed")
        }
    }
}

/// Map an extraction outcome to the passthrough response.
pub fn extraction_response(
    result: Result<ShipmentRecord, ExtractionError>,
) -> (StatusCode, Json<ParseDocumentResponse>) {
    match result {
        Ok(record) => ParseDocumentResponse::parsed(record),
        Err(e) => ParseDocumentResponse::failed(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
