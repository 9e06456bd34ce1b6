//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    extract::{DefaultBodyLimit, Extension},
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    BoxError, Router,
};
use intake::{
    BroadcastNotifier, ExtractionConfig, ExtractionModel, ExtractionService, FileStore,
    IngestConfig, Ingestor, IntakePipeline, RecordStore,
};
use sqlx::PgPool;
use tower::timeout::{error::Elapsed, TimeoutLayer};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::routes::{
    changes_handler, file_handler, get_shipment_handler, health_handler, ingest_handler,
    list_parsing_logs_handler, list_shipments_handler, parse_document_handler, stats_handler,
    update_shipment_handler, ApiError,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: IntakePipeline,
    pub records: Arc<dyn RecordStore>,
    pub files: Arc<dyn FileStore>,
    pub changes: BroadcastNotifier,
    /// Present when records live in Postgres (used by the health check)
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// Wire the pipeline over the given collaborators.
    pub fn new(
        records: Arc<dyn RecordStore>,
        files: Arc<dyn FileStore>,
        model: Arc<dyn ExtractionModel>,
        extraction: ExtractionConfig,
        ingest: IngestConfig,
    ) -> Self {
        let changes = BroadcastNotifier::new();
        let extractor = ExtractionService::new(
            records.clone(),
            model,
            Arc::new(changes.clone()),
            extraction,
        );
        let ingestor = Ingestor::new(files.clone(), ingest);

        Self {
            pipeline: IntakePipeline::new(ingestor, extractor),
            records,
            files,
            changes,
            db_pool: None,
        }
    }

    pub fn with_db_pool(mut self, pool: PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    pub fn extractor(&self) -> &ExtractionService {
        self.pipeline.extractor()
    }
}

/// HTTP-level options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Empty means any origin
    pub allowed_origins: Vec<String>,
    /// Upper bound for non-streaming requests
    pub request_timeout: Duration,
    /// Largest accepted request body on upload routes
    pub max_body_bytes: usize,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            request_timeout: Duration::from_secs(60),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([CONTENT_TYPE])
}

/// Render a timed-out or failed middleware call as the JSON error body.
async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::Timeout("Request timed out".to_string())
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
        ApiError::Internal(err.to_string())
    }
}

/// Build the Axum application router
pub fn build_app(state: AppState, options: &AppOptions) -> Router {
    // Multipart framing adds a little on top of the file itself.
    let upload_limit = DefaultBodyLimit::max(options.max_body_bytes + 64 * 1024);

    let api = Router::new()
        .route(
            "/api/parse-document",
            post(parse_document_handler).layer(upload_limit.clone()),
        )
        .route("/api/ingest", post(ingest_handler).layer(upload_limit))
        .route("/api/shipments", get(list_shipments_handler))
        .route(
            "/api/shipments/:id",
            get(get_shipment_handler).patch(update_shipment_handler),
        )
        .route("/api/parsing-logs", get(list_parsing_logs_handler))
        .route("/api/stats", get(stats_handler))
        .route("/files/:key", get(file_handler))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(options.request_timeout)),
        );

    Router::new()
        .merge(api)
        // Long-lived; kept outside the timeout layer
        .route("/api/changes", get(changes_handler))
        .route("/health", get(health_handler))
        .layer(Extension(state))
        .layer(cors_layer(&options.allowed_origins))
        .layer(TraceLayer::new_for_http())
}
