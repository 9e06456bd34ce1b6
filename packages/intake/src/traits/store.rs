//! Record store traits for attempts and shipments.
//!
//! The record store is split into focused traits:
//! - `AttemptLog`: the `parsing_logs` audit table
//! - `ShipmentStore`: the `shipment_orders` table
//! - `RecordStore`: composite trait combining both
//!
//! Backends only promise per-row atomicity, with one exception: an attempt
//! and the shipment pointing at it are checked against each other, so a
//! `failed` attempt never owns a shipment.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::types::{
    attempt::{AttemptFilter, AttemptResolution, AttemptStatus, ExtractionAttempt},
    shipment::{ShipmentFilter, ShipmentRecord, ShipmentUpdate},
};

/// Audit log of extraction attempts.
#[async_trait]
pub trait AttemptLog: Send + Sync {
    /// Persist a freshly created attempt.
    async fn insert_attempt(&self, attempt: &ExtractionAttempt) -> StoreResult<ExtractionAttempt>;

    /// Apply the single terminal update to an attempt.
    ///
    /// Must fail with `StoreError::AlreadyResolved` when the attempt is no
    /// longer `processing`, and `StoreError::NotFound` when it does not exist.
    /// A `failed` resolution must fail with `StoreError::HasShipment` when a
    /// shipment already references the attempt.
    async fn resolve_attempt(
        &self,
        id: Uuid,
        resolution: AttemptResolution,
    ) -> StoreResult<ExtractionAttempt>;

    /// Get an attempt by id.
    async fn get_attempt(&self, id: Uuid) -> StoreResult<Option<ExtractionAttempt>>;

    /// List attempts, newest first.
    async fn list_attempts(&self, filter: &AttemptFilter) -> StoreResult<Vec<ExtractionAttempt>>;

    /// Count attempts, optionally by status.
    async fn count_attempts(&self, status: Option<AttemptStatus>) -> StoreResult<u64>;
}

/// Shipment table.
#[async_trait]
pub trait ShipmentStore: Send + Sync {
    /// Persist a new shipment.
    ///
    /// When `parsing_log_id` names an attempt that is no longer
    /// `processing`, must fail with `StoreError::AlreadyResolved`.
    async fn insert_shipment(&self, record: &ShipmentRecord) -> StoreResult<ShipmentRecord>;

    /// Apply a manual edit and return the updated record.
    async fn update_shipment(&self, id: Uuid, update: ShipmentUpdate)
        -> StoreResult<ShipmentRecord>;

    /// Get a shipment by id.
    async fn get_shipment(&self, id: Uuid) -> StoreResult<Option<ShipmentRecord>>;

    /// The shipment produced by an attempt, if any.
    async fn find_by_attempt(&self, attempt_id: Uuid) -> StoreResult<Option<ShipmentRecord>>;

    /// List shipments matching a filter, newest first.
    async fn list_shipments(&self, filter: &ShipmentFilter) -> StoreResult<Vec<ShipmentRecord>>;

    /// Count shipments matching a filter (limit/offset ignored).
    async fn count_shipments(&self, filter: &ShipmentFilter) -> StoreResult<u64>;
}

/// Composite record store.
///
/// This is the trait the extraction service is built on.
pub trait RecordStore: AttemptLog + ShipmentStore {}

// Blanket implementation: anything implementing both traits is a RecordStore
impl<T: AttemptLog + ShipmentStore> RecordStore for T {}
