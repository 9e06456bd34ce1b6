//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the intake library
//! without making real model calls or touching a database.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{ModelError, ModelResult, StoreError, StoreResult};
use crate::stores::MemoryRecordStore;
use crate::traits::{
    files::FileStore,
    model::{CompletionRequest, ExtractionModel},
    notify::{ChangeNotifier, RecordChange},
    store::{AttemptLog, ShipmentStore},
};
use crate::types::{
    attempt::{AttemptFilter, AttemptResolution, AttemptStatus, ExtractionAttempt},
    input::StoredFile,
    shipment::{ShipmentFilter, ShipmentRecord, ShipmentUpdate},
};

/// A scripted model response.
#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Error {
        status: Option<u16>,
        message: String,
    },
    Delayed(Duration, String),
}

/// A mock extraction model for testing.
///
/// Replies are consumed in the order they were queued. An empty queue
/// answers with an upstream error.
#[derive(Default, Clone)]
pub struct MockModel {
    replies: Arc<RwLock<VecDeque<MockReply>>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<CompletionRequest>>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw text reply.
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.push(MockReply::Text(text.into()))
    }

    /// Queue a JSON reply.
    pub fn with_json(self, value: serde_json::Value) -> Self {
        self.push(MockReply::Text(value.to_string()))
    }

    /// Queue an upstream failure with an HTTP status.
    pub fn with_error(self, status: u16, message: impl Into<String>) -> Self {
        self.push(MockReply::Error {
            status: Some(status),
            message: message.into(),
        })
    }

    /// Queue a transport failure (no status).
    pub fn with_network_error(self, message: impl Into<String>) -> Self {
        self.push(MockReply::Error {
            status: None,
            message: message.into(),
        })
    }

    /// Queue a reply that only arrives after `delay`.
    pub fn with_delayed_reply(self, delay: Duration, text: impl Into<String>) -> Self {
        self.push(MockReply::Delayed(delay, text.into()))
    }

    /// Requests received so far.
    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    fn push(self, reply: MockReply) -> Self {
        self.replies.write().unwrap().push_back(reply);
        self
    }
}

#[async_trait]
impl ExtractionModel for MockModel {
    async fn complete(&self, request: &CompletionRequest) -> ModelResult<String> {
        self.calls.write().unwrap().push(request.clone());
        let reply = self.replies.write().unwrap().pop_front();

        match reply {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Error { status, message }) => {
                Err(ModelError::Upstream { status, message })
            }
            Some(MockReply::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            None => Err(ModelError::Upstream {
                status: None,
                message: "no mock reply queued".into(),
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Record store that fails selected writes.
///
/// Everything else is delegated to an inner [`MemoryRecordStore`].
#[derive(Default)]
pub struct FaultyRecordStore {
    inner: MemoryRecordStore,
    fail_attempt_insert: AtomicBool,
    fail_resolution: AtomicBool,
    fail_shipment_insert: AtomicBool,
}

impl FaultyRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `insert_attempt` fails.
    pub fn failing_attempt_insert(self) -> Self {
        self.fail_attempt_insert.store(true, Ordering::SeqCst);
        self
    }

    /// `resolve_attempt` fails.
    pub fn failing_resolution(self) -> Self {
        self.fail_resolution.store(true, Ordering::SeqCst);
        self
    }

    /// `insert_shipment` fails.
    pub fn failing_shipment_insert(self) -> Self {
        self.fail_shipment_insert.store(true, Ordering::SeqCst);
        self
    }

    /// Toggle resolution failures after construction.
    pub fn set_fail_resolution(&self, fail: bool) {
        self.fail_resolution.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryRecordStore {
        &self.inner
    }
}

fn injected(operation: &str) -> StoreError {
    StoreError::Backend(format!("injected failure: {operation}"))
}

#[async_trait]
impl AttemptLog for FaultyRecordStore {
    async fn insert_attempt(&self, attempt: &ExtractionAttempt) -> StoreResult<ExtractionAttempt> {
        if self.fail_attempt_insert.load(Ordering::SeqCst) {
            return Err(injected("insert parsing log"));
        }
        self.inner.insert_attempt(attempt).await
    }

    async fn resolve_attempt(
        &self,
        id: Uuid,
        resolution: AttemptResolution,
    ) -> StoreResult<ExtractionAttempt> {
        if self.fail_resolution.load(Ordering::SeqCst) {
            return Err(injected("update parsing log"));
        }
        self.inner.resolve_attempt(id, resolution).await
    }

    async fn get_attempt(&self, id: Uuid) -> StoreResult<Option<ExtractionAttempt>> {
        self.inner.get_attempt(id).await
    }

    async fn list_attempts(&self, filter: &AttemptFilter) -> StoreResult<Vec<ExtractionAttempt>> {
        self.inner.list_attempts(filter).await
    }

    async fn count_attempts(&self, status: Option<AttemptStatus>) -> StoreResult<u64> {
        self.inner.count_attempts(status).await
    }
}

#[async_trait]
impl ShipmentStore for FaultyRecordStore {
    async fn insert_shipment(&self, record: &ShipmentRecord) -> StoreResult<ShipmentRecord> {
        if self.fail_shipment_insert.load(Ordering::SeqCst) {
            return Err(injected("insert shipment"));
        }
        self.inner.insert_shipment(record).await
    }

    async fn update_shipment(
        &self,
        id: Uuid,
        update: ShipmentUpdate,
    ) -> StoreResult<ShipmentRecord> {
        self.inner.update_shipment(id, update).await
    }

    async fn get_shipment(&self, id: Uuid) -> StoreResult<Option<ShipmentRecord>> {
        self.inner.get_shipment(id).await
    }

    async fn find_by_attempt(&self, attempt_id: Uuid) -> StoreResult<Option<ShipmentRecord>> {
        self.inner.find_by_attempt(attempt_id).await
    }

    async fn list_shipments(&self, filter: &ShipmentFilter) -> StoreResult<Vec<ShipmentRecord>> {
        self.inner.list_shipments(filter).await
    }

    async fn count_shipments(&self, filter: &ShipmentFilter) -> StoreResult<u64> {
        self.inner.count_shipments(filter).await
    }
}

/// File store that rejects every write.
#[derive(Default)]
pub struct FaultyFileStore {
    puts: AtomicUsize,
}

impl FaultyFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rejected `put` calls.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileStore for FaultyFileStore {
    async fn put(&self, key: &str, _bytes: Bytes) -> StoreResult<StoredFile> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Backend(format!("bucket unavailable: {key}")))
    }

    async fn get(&self, key: &str) -> StoreResult<Bytes> {
        Err(StoreError::NotFound {
            kind: "file",
            id: key.to_string(),
        })
    }

    fn name(&self) -> &str {
        "faulty"
    }
}

/// Notifier that keeps every change for later assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    changes: RwLock<Vec<RecordChange>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> Vec<RecordChange> {
        self.changes.read().unwrap().clone()
    }
}

impl ChangeNotifier for RecordingNotifier {
    fn notify(&self, change: RecordChange) {
        self.changes.write().unwrap().push(change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "test".into(),
            system: "sys".into(),
            user: "doc".into(),
            temperature: 0.1,
            max_tokens: 10,
        }
    }

    #[tokio::test]
    async fn test_mock_model_replays_queue_in_order() {
        let model = MockModel::new().with_reply("first").with_error(500, "boom");

        assert_eq!(model.complete(&request()).await.unwrap(), "first");
        let err = model.complete(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "upstream returned status 500: boom");
        assert!(model.complete(&request()).await.is_err());
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn test_faulty_store_delegates_unfaulted_ops() {
        let store = FaultyRecordStore::new().failing_resolution();
        let attempt = ExtractionAttempt::new("a.txt", None);
        store.insert_attempt(&attempt).await.unwrap();

        assert!(store
            .resolve_attempt(attempt.id, AttemptResolution::failed("x", None))
            .await
            .is_err());
        assert_eq!(store.inner().attempt_count(), 1);
    }
}
