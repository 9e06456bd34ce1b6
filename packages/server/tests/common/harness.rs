//! Test harness over in-memory stores and a scripted model.
//!
//! Every test gets fresh stores; nothing leaves the process.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use intake::{
    ExtractionConfig, FileStore, IngestConfig, MemoryFileStore, MemoryRecordStore, MockModel,
    RecordStore,
};
use serde_json::Value;
use server_core::server::{build_app, AppOptions, AppState};
use test_context::AsyncTestContext;
use tower::ServiceExt;

pub const BOUNDARY: &str = "intake-test-boundary";

/// Test harness that owns the application state.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let (status, body) = ctx.get("/api/stats").await;
/// }
/// ```
pub struct TestHarness {
    pub records: Arc<MemoryRecordStore>,
    pub files: Arc<MemoryFileStore>,
    /// Shares its reply queue with the model inside `state`
    pub model: MockModel,
    pub state: AppState,
    pub options: AppOptions,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let records = Arc::new(MemoryRecordStore::new());
        let files = Arc::new(MemoryFileStore::new());
        let model = MockModel::new();

        let state = AppState::new(
            records.clone() as Arc<dyn RecordStore>,
            files.clone() as Arc<dyn FileStore>,
            Arc::new(model.clone()),
            ExtractionConfig::default(),
            IngestConfig::default().with_max_file_bytes(1024),
        );

        Self {
            records,
            files,
            model,
            state,
            options: AppOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AppOptions) -> Self {
        self.options = options;
        self
    }

    pub fn app(&self) -> Router {
        build_app(self.state.clone(), &self.options)
    }

    /// Queue the model's next reply.
    pub fn reply_with(&self, value: Value) {
        let _ = self.model.clone().with_json(value);
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send_json(Method::POST, uri, body).await
    }

    pub async fn patch_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send_json(Method::PATCH, uri, body).await
    }

    async fn send_json(&self, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// POST a single multipart field to `/api/ingest`.
    pub async fn upload(&self, field: MultipartField<'_>) -> (StatusCode, Value) {
        let request = Request::post("/api/ingest")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(field.encode()))
            .unwrap();
        self.send(request).await
    }
}

pub enum MultipartField<'a> {
    File { name: &'a str, bytes: &'a [u8] },
    Text(&'a str),
}

impl MultipartField<'_> {
    fn encode(&self) -> Vec<u8> {
        let mut body = format!("--{BOUNDARY}\r\n").into_bytes();
        match self {
            Self::File { name, bytes } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Self::Text(text) => {
                body.extend_from_slice(b"Content-Disposition: form-data; name=\"text\"\r\n\r\n");
                body.extend_from_slice(text.as_bytes());
            }
        }
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }
}
