//! Shipment Intake Library
//!
//! Turns uploaded documents and pasted email text into validated shipment
//! records, with an audit attempt written around every model call.
//!
//! # Design Philosophy
//!
//! - One model call per document, never retried
//! - Every attempt ends in `success` or `failed`, never stuck in `processing`
//! - Collaborators (stores, model, notifier) are injected as traits
//! - Library handles the pipeline, the app handles transport
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use intake::{ExtractionConfig, ExtractionService, MemoryRecordStore, NoopNotifier};
//! use intake::testing::MockModel;
//!
//! let service = ExtractionService::new(
//!     Arc::new(MemoryRecordStore::new()),
//!     Arc::new(MockModel::new().with_json(json!({"customer_name": "Jane", "address": "12 Oak St"}))),
//!     Arc::new(NoopNotifier),
//!     ExtractionConfig::default(),
//! );
//!
//! let shipment = service.extract("Ship to Jane, 12 Oak St", "order.txt", None).await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator abstractions (RecordStore, FileStore, ExtractionModel, ChangeNotifier)
//! - [`types`] - Attempts, shipments, inputs and config
//! - [`pipeline`] - Ingestion adapter and extraction service
//! - [`stores`] - Storage implementations (memory, local filesystem, Postgres)
//! - [`stats`] - Monitoring counters
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod pipeline;
pub mod stats;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use error::{
    ExtractionError, FailureReason, IngestError, IntakeError, ModelError, StoreError,
    INVALID_FORMAT_MESSAGE, MISSING_FIELDS_MESSAGE,
};
pub use traits::{
    files::FileStore,
    model::{CompletionRequest, ExtractionModel},
    notify::{BroadcastNotifier, ChangeKind, ChangeNotifier, NoopNotifier, RecordChange, Table},
    store::{AttemptLog, RecordStore, ShipmentStore},
};
pub use types::{
    attempt::{AttemptFilter, AttemptResolution, AttemptStatus, ExtractionAttempt},
    config::{ExtractionConfig, IngestConfig},
    input::{IngestInput, NormalizedInput, StoredFile},
    shipment::{
        ShipmentFilter, ShipmentPayload, ShipmentRecord, ShipmentSource, ShipmentStatus,
        ShipmentUpdate,
    },
    ParseStatusError,
};

pub use pipeline::{
    ExtractionService, Ingestor, IntakePipeline, ReapReport, ValidationError,
    STALE_ATTEMPT_MESSAGE,
};
pub use stats::IntakeStats;

// Re-export stores
pub use stores::{LocalFileStore, MemoryFileStore, MemoryRecordStore};

#[cfg(feature = "postgres")]
pub use stores::PostgresRecordStore;

#[cfg(feature = "openai")]
pub use ai::OpenAIModel;

// Re-export testing utilities
pub use testing::{FaultyFileStore, FaultyRecordStore, MockModel, RecordingNotifier};
