//! In-memory storage implementations for testing and development.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::traits::{
    files::{content_hash, validate_key, FileStore},
    store::{AttemptLog, ShipmentStore},
};
use crate::types::{
    attempt::{AttemptFilter, AttemptResolution, AttemptStatus, ExtractionAttempt},
    input::StoredFile,
    shipment::{ShipmentFilter, ShipmentRecord, ShipmentUpdate},
};

/// In-memory record store for attempts and shipments.
///
/// Useful for testing and development. Not suitable for production
/// as data is lost on restart.
pub struct MemoryRecordStore {
    attempts: RwLock<HashMap<Uuid, ExtractionAttempt>>,
    shipments: RwLock<HashMap<Uuid, ShipmentRecord>>,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecordStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            attempts: RwLock::new(HashMap::new()),
            shipments: RwLock::new(HashMap::new()),
        }
    }

    /// Get the number of stored attempts.
    pub fn attempt_count(&self) -> usize {
        self.attempts.read().unwrap().len()
    }

    /// Get the number of stored shipments.
    pub fn shipment_count(&self) -> usize {
        self.shipments.read().unwrap().len()
    }

    /// Snapshot of all attempts, newest first.
    pub fn attempts(&self) -> Vec<ExtractionAttempt> {
        let mut attempts: Vec<_> = self.attempts.read().unwrap().values().cloned().collect();
        attempts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        attempts
    }

    /// Snapshot of all shipments, newest first.
    pub fn shipments(&self) -> Vec<ShipmentRecord> {
        let mut shipments: Vec<_> = self.shipments.read().unwrap().values().cloned().collect();
        shipments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        shipments
    }
}

#[async_trait]
impl AttemptLog for MemoryRecordStore {
    async fn insert_attempt(&self, attempt: &ExtractionAttempt) -> StoreResult<ExtractionAttempt> {
        let mut attempts = self.attempts.write().unwrap();
        if attempts.contains_key(&attempt.id) {
            return Err(StoreError::Backend(format!(
                "duplicate parsing_logs id {}",
                attempt.id
            )));
        }
        attempts.insert(attempt.id, attempt.clone());
        Ok(attempt.clone())
    }

    async fn resolve_attempt(
        &self,
        id: Uuid,
        resolution: AttemptResolution,
    ) -> StoreResult<ExtractionAttempt> {
        // Lock order: attempts, then shipments.
        let mut attempts = self.attempts.write().unwrap();
        let attempt = attempts.get_mut(&id).ok_or_else(|| StoreError::NotFound {
            kind: "parsing log",
            id: id.to_string(),
        })?;
        if resolution.status() == AttemptStatus::Failed
            && !attempt.status.is_terminal()
            && self
                .shipments
                .read()
                .unwrap()
                .values()
                .any(|s| s.parsing_log_id == Some(id))
        {
            return Err(StoreError::HasShipment { id });
        }
        attempt.resolve(resolution)?;
        Ok(attempt.clone())
    }

    async fn get_attempt(&self, id: Uuid) -> StoreResult<Option<ExtractionAttempt>> {
        Ok(self.attempts.read().unwrap().get(&id).cloned())
    }

    async fn list_attempts(&self, filter: &AttemptFilter) -> StoreResult<Vec<ExtractionAttempt>> {
        Ok(self
            .attempts()
            .into_iter()
            .filter(|a| filter.matches(a))
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn count_attempts(&self, status: Option<AttemptStatus>) -> StoreResult<u64> {
        Ok(self
            .attempts
            .read()
            .unwrap()
            .values()
            .filter(|a| status.map_or(true, |s| s == a.status))
            .count() as u64)
    }
}

#[async_trait]
impl ShipmentStore for MemoryRecordStore {
    async fn insert_shipment(&self, record: &ShipmentRecord) -> StoreResult<ShipmentRecord> {
        record.validate()?;
        let attempts = self.attempts.read().unwrap();
        if let Some(attempt) = record.parsing_log_id.and_then(|id| attempts.get(&id)) {
            if attempt.status.is_terminal() {
                return Err(StoreError::AlreadyResolved { id: attempt.id });
            }
        }
        let mut shipments = self.shipments.write().unwrap();
        if shipments.contains_key(&record.id) {
            return Err(StoreError::Backend(format!(
                "duplicate shipment_orders id {}",
                record.id
            )));
        }
        shipments.insert(record.id, record.clone());
        Ok(record.clone())
    }

    async fn update_shipment(
        &self,
        id: Uuid,
        update: ShipmentUpdate,
    ) -> StoreResult<ShipmentRecord> {
        let mut shipments = self.shipments.write().unwrap();
        let record = shipments.get_mut(&id).ok_or_else(|| StoreError::NotFound {
            kind: "shipment",
            id: id.to_string(),
        })?;
        record.apply_update(update)?;
        Ok(record.clone())
    }

    async fn get_shipment(&self, id: Uuid) -> StoreResult<Option<ShipmentRecord>> {
        Ok(self.shipments.read().unwrap().get(&id).cloned())
    }

    async fn find_by_attempt(&self, attempt_id: Uuid) -> StoreResult<Option<ShipmentRecord>> {
        Ok(self
            .shipments
            .read()
            .unwrap()
            .values()
            .find(|s| s.parsing_log_id == Some(attempt_id))
            .cloned())
    }

    async fn list_shipments(&self, filter: &ShipmentFilter) -> StoreResult<Vec<ShipmentRecord>> {
        Ok(self
            .shipments()
            .into_iter()
            .filter(|s| filter.matches(s))
            .skip(filter.offset.unwrap_or(0))
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn count_shipments(&self, filter: &ShipmentFilter) -> StoreResult<u64> {
        Ok(self
            .shipments
            .read()
            .unwrap()
            .values()
            .filter(|s| filter.matches(s))
            .count() as u64)
    }
}

/// In-memory file store.
#[derive(Default)]
pub struct MemoryFileStore {
    files: RwLock<HashMap<String, Bytes>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored files.
    pub fn file_count(&self) -> usize {
        self.files.read().unwrap().len()
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.files.read().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn put(&self, key: &str, bytes: Bytes) -> StoreResult<StoredFile> {
        validate_key(key)?;
        let mut files = self.files.write().unwrap();
        if files.contains_key(key) {
            return Err(StoreError::Backend(format!("file already exists: {key}")));
        }
        let stored = StoredFile {
            key: key.to_string(),
            path: key.to_string(),
            public_url: format!("memory://{key}"),
            size_bytes: bytes.len() as u64,
            content_hash: content_hash(&bytes),
        };
        files.insert(key.to_string(), bytes);
        Ok(stored)
    }

    async fn get(&self, key: &str) -> StoreResult<Bytes> {
        validate_key(key)?;
        self.files
            .read()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "file",
                id: key.to_string(),
            })
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::shipment::{ShipmentPayload, ShipmentSource, ShipmentStatus};
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn shipment(name: &str) -> ShipmentRecord {
        ShipmentRecord::from_payload(
            ShipmentPayload {
                customer_name: name.into(),
                address: "1 Main St".into(),
                tracking_id: None,
                delivery_date: None,
                package_weight: None,
                notes: None,
            },
            ShipmentSource::default(),
        )
    }

    #[tokio::test]
    async fn test_resolve_attempt_once() {
        let store = MemoryRecordStore::new();
        let attempt = ExtractionAttempt::new("a.txt", None);
        store.insert_attempt(&attempt).await.unwrap();

        let resolved = store
            .resolve_attempt(attempt.id, AttemptResolution::success(json!({})))
            .await
            .unwrap();
        assert_eq!(resolved.status, AttemptStatus::Success);

        let err = store
            .resolve_attempt(attempt.id, AttemptResolution::failed("again", None))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyResolved { .. }));

        let stored = store.get_attempt(attempt.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AttemptStatus::Success);
    }

    #[tokio::test]
    async fn test_resolve_missing_attempt() {
        let store = MemoryRecordStore::new();
        let err = store
            .resolve_attempt(Uuid::new_v4(), AttemptResolution::failed("x", None))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_attempts_created_before() {
        let store = MemoryRecordStore::new();

        let mut old = ExtractionAttempt::new("old.txt", None);
        old.created_at = Utc::now() - Duration::hours(2);
        let mut old_done = ExtractionAttempt::new("old-done.txt", None);
        old_done.created_at = Utc::now() - Duration::hours(2);
        let fresh = ExtractionAttempt::new("fresh.txt", None);

        for a in [&old, &old_done, &fresh] {
            store.insert_attempt(a).await.unwrap();
        }
        store
            .resolve_attempt(old_done.id, AttemptResolution::success(json!({})))
            .await
            .unwrap();

        let stale = store
            .list_attempts(
                &AttemptFilter::default()
                    .with_status(AttemptStatus::Processing)
                    .with_created_before(Utc::now() - Duration::minutes(15)),
            )
            .await
            .unwrap();

        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, old.id);
        assert_eq!(store.count_attempts(Some(AttemptStatus::Processing)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_find_by_attempt() {
        let store = MemoryRecordStore::new();
        let attempt_id = Uuid::new_v4();
        let mut record = shipment("Ann");
        record.parsing_log_id = Some(attempt_id);
        store.insert_shipment(&record).await.unwrap();

        let found = store.find_by_attempt(attempt_id).await.unwrap().unwrap();
        assert_eq!(found.id, record.id);
        assert!(store.find_by_attempt(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_attempt_and_shipment_guard_each_other() {
        let store = MemoryRecordStore::new();

        // A failed attempt cannot gain a shipment.
        let failed = ExtractionAttempt::new("failed.txt", None);
        store.insert_attempt(&failed).await.unwrap();
        store
            .resolve_attempt(failed.id, AttemptResolution::failed("gave up", None))
            .await
            .unwrap();
        let mut late = shipment("Ann");
        late.parsing_log_id = Some(failed.id);
        let err = store.insert_shipment(&late).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyResolved { .. }));
        assert_eq!(store.shipment_count(), 0);

        // An attempt with a shipment cannot be failed, only succeed.
        let open = ExtractionAttempt::new("open.txt", None);
        store.insert_attempt(&open).await.unwrap();
        let mut record = shipment("Bob");
        record.parsing_log_id = Some(open.id);
        store.insert_shipment(&record).await.unwrap();

        let err = store
            .resolve_attempt(open.id, AttemptResolution::failed("gave up", None))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::HasShipment { .. }));
        let resolved = store
            .resolve_attempt(open.id, AttemptResolution::success(json!({})))
            .await
            .unwrap();
        assert_eq!(resolved.status, AttemptStatus::Success);
    }

    #[tokio::test]
    async fn test_list_shipments_paginates_newest_first() {
        let store = MemoryRecordStore::new();
        for (i, name) in ["Ann", "Bob", "Cat"].into_iter().enumerate() {
            let mut record = shipment(name);
            record.created_at = Utc::now() + Duration::seconds(i as i64);
            store.insert_shipment(&record).await.unwrap();
        }

        let page = store
            .list_shipments(&ShipmentFilter::new().with_limit(2))
            .await
            .unwrap();
        let names: Vec<_> = page.iter().map(|s| s.customer_name.as_str()).collect();
        assert_eq!(names, ["Cat", "Bob"]);

        let rest = store
            .list_shipments(&ShipmentFilter::new().with_offset(2))
            .await
            .unwrap();
        assert_eq!(rest[0].customer_name, "Ann");

        assert_eq!(store.count_shipments(&ShipmentFilter::new()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_update_shipment() {
        let store = MemoryRecordStore::new();
        let record = store.insert_shipment(&shipment("Ann")).await.unwrap();

        let updated = store
            .update_shipment(
                record.id,
                ShipmentUpdate::new().with_status(ShipmentStatus::Shipped),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, ShipmentStatus::Shipped);
        assert!(updated.updated_at >= record.updated_at);

        let err = store
            .update_shipment(Uuid::new_v4(), ShipmentUpdate::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_insert_rejects_blank_customer() {
        let store = MemoryRecordStore::new();
        let err = store.insert_shipment(&shipment(" ")).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        assert_eq!(store.shipment_count(), 0);
    }

    #[tokio::test]
    async fn test_file_store_put_get() {
        let files = MemoryFileStore::new();
        let stored = files
            .put("1_order.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        assert_eq!(stored.public_url, "memory://1_order.txt");
        assert_eq!(stored.size_bytes, 5);

        assert_eq!(files.get("1_order.txt").await.unwrap(), "hello");
        assert!(files.put("1_order.txt", Bytes::new()).await.is_err());
        assert!(matches!(
            files.get("missing").await.unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }
}
