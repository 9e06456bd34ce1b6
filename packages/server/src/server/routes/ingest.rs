//! POST /api/ingest
//!
//! Multipart upload: a `file` part, or a `text` field with pasted content.
//! The input is normalized, stored and extracted in one request.

use axum::{
    extract::{Extension, Multipart},
    http::StatusCode,
    Json,
};
use intake::{IngestError, IngestInput, IntakeError};

use crate::server::app::AppState;
use crate::server::routes::parse::{extraction_response, ParseDocumentResponse};

pub async fn ingest_handler(
    Extension(state): Extension<AppState>,
    mut multipart: Multipart,
) -> (StatusCode, Json<ParseDocumentResponse>) {
    let input = match read_input(&mut multipart).await {
        Ok(Some(input)) => input,
        Ok(None) => {
            return ParseDocumentResponse::failed(
                StatusCode::BAD_REQUEST,
                "expected a `file` part or a `text` field",
            )
        }
        Err((status, message)) => return ParseDocumentResponse::failed(status, message),
    };

    let pipeline = state.pipeline.clone();
    let task = tokio::spawn(async move { pipeline.run(input).await });

    match task.await {
        Ok(Ok(record)) => ParseDocumentResponse::parsed(record),
        Ok(Err(IntakeError::Extraction(e))) => extraction_response(Err(e)),
        Ok(Err(IntakeError::Ingest(e))) => {
            let status = match &e {
                IngestError::Read(_) => StatusCode::BAD_REQUEST,
                IngestError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                IngestError::Store(_) => {
                    tracing::error!(error = %e, "Failed to store upload");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            ParseDocumentResponse::failed(status, e.to_string())
        }
        Err(e) => {
            tracing::error!(error = %e, "Ingest task panicked");
            ParseDocumentResponse::failed(StatusCode::INTERNAL_SERVER_ERROR, "ingest task failed")
        }
    }
}

/// First usable `file` or `text` field.
async fn read_input(
    multipart: &mut Multipart,
) -> Result<Option<IngestInput>, (StatusCode, String)> {
    let bad = |e: axum::extract::multipart::MultipartError| (e.status(), e.body_text());

    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(bad)?;
                return Ok(Some(IngestInput::file(bytes, name)));
            }
            Some("text") => {
                let content = field.text().await.map_err(bad)?;
                return Ok(Some(IngestInput::text(content)));
            }
            _ => continue,
        }
    }
    Ok(None)
}
