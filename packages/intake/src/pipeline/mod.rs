//! The intake pipeline.
//!
//! - [`ingest`] normalizes uploads and pasted text
//! - [`extract`] runs the audited model call
//! - [`validate`] turns model JSON into a typed payload
//! - [`prompts`] holds the fixed instructions

pub mod extract;
pub mod ingest;
pub mod prompts;
pub mod validate;

pub use extract::{ExtractionService, ReapReport, STALE_ATTEMPT_MESSAGE};
pub use ingest::{decode_text, sanitize_file_name, storage_key, Ingestor};
pub use prompts::{format_extract_prompt, EXTRACT_PROMPT, SYSTEM_PROMPT};
pub use validate::{parse_model_output, validate_payload, ValidationError};

use tracing::instrument;

use crate::error::IntakeError;
use crate::types::{input::IngestInput, shipment::ShipmentRecord};

/// Ingest followed by extract.
#[derive(Clone)]
pub struct IntakePipeline {
    ingestor: Ingestor,
    extractor: ExtractionService,
}

impl IntakePipeline {
    pub fn new(ingestor: Ingestor, extractor: ExtractionService) -> Self {
        Self {
            ingestor,
            extractor,
        }
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    pub fn extractor(&self) -> &ExtractionService {
        &self.extractor
    }

    /// Normalize an input and extract a shipment from it.
    ///
    /// Ingest failures happen before any attempt is written.
    #[instrument(skip_all)]
    pub async fn run(&self, input: IngestInput) -> Result<ShipmentRecord, IntakeError> {
        let normalized = self.ingestor.ingest(input).await?;
        Ok(self.extractor.process(&normalized).await?)
    }
}
