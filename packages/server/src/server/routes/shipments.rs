//! Shipment table: search, fetch and manual edit.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    Json,
};
use intake::{ShipmentFilter, ShipmentRecord, ShipmentStatus, ShipmentUpdate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::server::app::AppState;
use crate::server::routes::ApiError;

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 500;

#[derive(Debug, Default, Deserialize)]
pub struct ShipmentQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub parsed_by_ai: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ShipmentQuery {
    fn into_filter(self) -> Result<ShipmentFilter, ApiError> {
        let status = self
            .status
            .filter(|s| !s.is_empty() && s != "all")
            .map(|s| s.parse::<ShipmentStatus>())
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        Ok(ShipmentFilter {
            search: self.search,
            status,
            parsed_by_ai: self.parsed_by_ai,
            limit: Some(self.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE)),
            offset: self.offset,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ShipmentPage {
    pub items: Vec<ShipmentRecord>,
    /// Matches across all pages
    pub total: u64,
}

/// GET /api/shipments
pub async fn list_shipments_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<ShipmentQuery>,
) -> Result<Json<ShipmentPage>, ApiError> {
    let filter = query.into_filter()?;
    let items = state.records.list_shipments(&filter).await?;
    let total = state.records.count_shipments(&filter).await?;
    Ok(Json(ShipmentPage { items, total }))
}

/// GET /api/shipments/:id
pub async fn get_shipment_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ShipmentRecord>, ApiError> {
    state
        .records
        .get_shipment(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("shipment not found: {id}")))
}

/// PATCH /api/shipments/:id
pub async fn update_shipment_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<ShipmentUpdate>, JsonRejection>,
) -> Result<Json<ShipmentRecord>, ApiError> {
    let Json(update) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let record = state.extractor().edit_shipment(id, update).await?;
    Ok(Json(record))
}
