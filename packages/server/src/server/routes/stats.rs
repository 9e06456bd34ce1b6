//! GET /api/stats - monitoring counters.

use axum::{extract::Extension, Json};
use intake::IntakeStats;

use crate::server::app::AppState;
use crate::server::routes::ApiError;

pub async fn stats_handler(
    Extension(state): Extension<AppState>,
) -> Result<Json<IntakeStats>, ApiError> {
    Ok(Json(IntakeStats::collect(state.records.as_ref()).await?))
}
