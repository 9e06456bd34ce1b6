//! GET /api/parsing-logs - the extraction audit trail, newest first.

use axum::extract::{Extension, Query};
use axum::Json;
use intake::{AttemptFilter, AttemptStatus, ExtractionAttempt};
use serde::Deserialize;

use crate::server::app::AppState;
use crate::server::routes::ApiError;

const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ParsingLogQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
}

pub async fn list_parsing_logs_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<ParsingLogQuery>,
) -> Result<Json<Vec<ExtractionAttempt>>, ApiError> {
    let mut filter = AttemptFilter::default().with_limit(query.limit.unwrap_or(DEFAULT_LIMIT));
    if let Some(status) = query.status.filter(|s| !s.is_empty() && s != "all") {
        let status: AttemptStatus = status
            .parse()
            .map_err(|e: intake::ParseStatusError| ApiError::BadRequest(e.to_string()))?;
        filter = filter.with_status(status);
    }

    Ok(Json(state.records.list_attempts(&filter).await?))
}
