//! Extraction service - one audited model call per document.
//!
//! Every call writes an attempt in `processing` before the model is invoked
//! and resolves it exactly once afterwards, whatever the outcome.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{ExtractionError, ModelError, StoreError, StoreResult};
use crate::pipeline::prompts::{format_extract_prompt, SYSTEM_PROMPT};
use crate::pipeline::validate::{parse_model_output, validate_payload, ValidationError};
use crate::traits::{
    model::{CompletionRequest, ExtractionModel},
    notify::{ChangeNotifier, RecordChange, Table},
    store::RecordStore,
};
use crate::types::{
    attempt::{AttemptFilter, AttemptResolution, AttemptStatus, ExtractionAttempt},
    config::ExtractionConfig,
    input::NormalizedInput,
    shipment::{ShipmentRecord, ShipmentSource, ShipmentUpdate},
};

/// Error recorded on attempts abandoned mid-flight.
pub const STALE_ATTEMPT_MESSAGE: &str = "Extraction abandoned before completion";

/// A failure after the attempt exists, plus the snapshot to record with it.
struct Failure {
    error: ExtractionError,
    snapshot: Option<Value>,
}

impl Failure {
    fn new(error: ExtractionError, snapshot: Option<Value>) -> Self {
        Self { error, snapshot }
    }
}

/// Outcome of a stale-attempt sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReapReport {
    /// Attempts marked failed
    pub failed: Vec<Uuid>,

    /// Attempts whose shipment had been written; marked success
    pub recovered: Vec<Uuid>,
}

impl ReapReport {
    pub fn is_empty(&self) -> bool {
        self.failed.is_empty() && self.recovered.is_empty()
    }
}

/// Runs extractions against the model and records them.
///
/// Holds no mutable state; share it behind an `Arc` and call it
/// concurrently.
#[derive(Clone)]
pub struct ExtractionService {
    records: Arc<dyn RecordStore>,
    model: Arc<dyn ExtractionModel>,
    notifier: Arc<dyn ChangeNotifier>,
    config: ExtractionConfig,
}

impl ExtractionService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        model: Arc<dyn ExtractionModel>,
        notifier: Arc<dyn ChangeNotifier>,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            records,
            model,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    /// Extract a normalized input.
    pub async fn process(&self, input: &NormalizedInput) -> Result<ShipmentRecord, ExtractionError> {
        self.extract(&input.text, &input.file_name, input.file_url.as_deref())
            .await
    }

    /// Extract one shipment from document text.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn extract(
        &self,
        text: &str,
        file_name: &str,
        file_url: Option<&str>,
    ) -> Result<ShipmentRecord, ExtractionError> {
        let attempt = ExtractionAttempt::new(file_name, file_url.map(str::to_string));
        let attempt = self
            .records
            .insert_attempt(&attempt)
            .await
            .map_err(ExtractionError::LogWrite)?;
        self.notifier
            .notify(RecordChange::inserted(Table::ParsingLogs, attempt.id));
        info!(attempt_id = %attempt.id, "Created extraction attempt");

        match self.run(&attempt, text).await {
            Ok((record, snapshot)) => {
                let resolved = self
                    .resolve(attempt.id, AttemptResolution::success(snapshot))
                    .await;
                if let Err(StoreError::AlreadyResolved { .. }) = resolved {
                    self.confirm_success(attempt.id).await?;
                }
                info!(
                    attempt_id = %attempt.id,
                    shipment_id = %record.id,
                    "Extracted shipment"
                );
                Ok(record)
            }
            Err(Failure { error, snapshot }) => {
                warn!(
                    attempt_id = %attempt.id,
                    reason = ?error.reason(),
                    error = %error,
                    "Extraction failed"
                );
                let _ = self
                    .resolve(
                        attempt.id,
                        AttemptResolution::failed(error.to_string(), snapshot),
                    )
                    .await;
                Err(error)
            }
        }
    }

    /// Steps between attempt creation and resolution.
    async fn run(
        &self,
        attempt: &ExtractionAttempt,
        text: &str,
    ) -> Result<(ShipmentRecord, Value), Failure> {
        let attempt_id = attempt.id;

        let output = self.call_model(text).await.map_err(|e| {
            Failure::new(
                ExtractionError::Upstream {
                    attempt_id,
                    message: e.to_string(),
                },
                None,
            )
        })?;

        let parsed = match parse_model_output(&output, self.config.strip_code_fences) {
            Ok(value) => value,
            Err(e) => {
                debug!(attempt_id = %attempt_id, error = %e, "Model output is not JSON");
                return Err(Failure::new(
                    ExtractionError::InvalidFormat { attempt_id },
                    Some(json!({ "raw_response": output })),
                ));
            }
        };

        let payload = match validate_payload(&parsed) {
            Ok(payload) => payload,
            Err(ValidationError::MissingFields) => {
                return Err(Failure::new(
                    ExtractionError::MissingFields { attempt_id },
                    Some(parsed),
                ))
            }
            Err(ValidationError::InvalidField { field, reason }) => {
                return Err(Failure::new(
                    ExtractionError::InvalidField {
                        attempt_id,
                        field,
                        reason,
                    },
                    Some(parsed),
                ))
            }
        };

        let record = ShipmentRecord::from_payload(
            payload,
            ShipmentSource {
                file_name: Some(attempt.file_name.clone()),
                file_url: attempt.file_url.clone(),
                parsing_log_id: Some(attempt_id),
            },
        );

        match self.records.insert_shipment(&record).await {
            Ok(record) => {
                self.notifier
                    .notify(RecordChange::inserted(Table::ShipmentOrders, record.id));
                Ok((record, parsed))
            }
            Err(e) => Err(Failure::new(
                ExtractionError::Store {
                    attempt_id,
                    message: e.to_string(),
                },
                Some(parsed),
            )),
        }
    }

    async fn call_model(&self, text: &str) -> Result<String, ModelError> {
        let request = CompletionRequest {
            model: self.config.model.clone(),
            system: SYSTEM_PROMPT.to_string(),
            user: format_extract_prompt(text),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let started = Instant::now();
        let result = tokio::time::timeout(self.config.request_timeout, self.model.complete(&request))
            .await
            .unwrap_or(Err(ModelError::Timeout(self.config.request_timeout)));

        debug!(
            model = %request.model,
            provider = self.model.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Model call finished"
        );
        result
    }

    /// Write the terminal status. A failed write is logged; a processing
    /// attempt left behind is picked up by the reaper.
    async fn resolve(&self, attempt_id: Uuid, resolution: AttemptResolution) -> StoreResult<()> {
        let status = resolution.status();
        match self.records.resolve_attempt(attempt_id, resolution).await {
            Ok(_) => {
                self.notifier
                    .notify(RecordChange::updated(Table::ParsingLogs, attempt_id));
                debug!(attempt_id = %attempt_id, status = %status, "Resolved extraction attempt");
                Ok(())
            }
            Err(e) => {
                error!(
                    attempt_id = %attempt_id,
                    status = %status,
                    error = %e,
                    "Failed to resolve extraction attempt"
                );
                Err(e)
            }
        }
    }

    /// Another writer resolved the attempt first. The shipment stands only
    /// if that resolution was a success.
    async fn confirm_success(&self, attempt_id: Uuid) -> Result<(), ExtractionError> {
        let status = self
            .records
            .get_attempt(attempt_id)
            .await
            .ok()
            .flatten()
            .map(|attempt| attempt.status);
        match status {
            Some(AttemptStatus::Success) => Ok(()),
            other => Err(ExtractionError::Store {
                attempt_id,
                message: format!("attempt resolved concurrently as {other:?}"),
            }),
        }
    }

    /// Resolve attempts left in `processing` for longer than `max_age`.
    ///
    /// An attempt whose shipment was written is marked success with that
    /// shipment as snapshot; the rest are marked failed. `max_age` is raised
    /// to [`ExtractionConfig::min_stale_age`] so a live model call is never
    /// swept.
    #[instrument(skip(self))]
    pub async fn reap_stale_attempts(&self, max_age: Duration) -> StoreResult<ReapReport> {
        let floor = self.config.min_stale_age();
        if max_age < floor {
            debug!(
                requested_secs = max_age.as_secs_f64(),
                floor_secs = floor.as_secs_f64(),
                "Raising stale attempt age to the extraction floor"
            );
        }
        let max_age = chrono::Duration::from_std(max_age.max(floor))
            .map_err(|e| StoreError::Invalid(format!("max_age out of range: {e}")))?;
        let cutoff = chrono::Utc::now() - max_age;

        let stale = self
            .records
            .list_attempts(
                &AttemptFilter::default()
                    .with_status(AttemptStatus::Processing)
                    .with_created_before(cutoff),
            )
            .await?;

        let mut report = ReapReport::default();
        for attempt in stale {
            let (resolution, mut recovered) = match self.records.find_by_attempt(attempt.id).await? {
                Some(shipment) => (AttemptResolution::success(shipment_snapshot(&shipment)), true),
                None => (AttemptResolution::failed(STALE_ATTEMPT_MESSAGE, None), false),
            };

            let mut outcome = self.records.resolve_attempt(attempt.id, resolution).await;
            // The shipment landed between the lookup and the write.
            if let Err(StoreError::HasShipment { .. }) = outcome {
                if let Some(shipment) = self.records.find_by_attempt(attempt.id).await? {
                    recovered = true;
                    outcome = self
                        .records
                        .resolve_attempt(
                            attempt.id,
                            AttemptResolution::success(shipment_snapshot(&shipment)),
                        )
                        .await;
                }
            }

            match outcome {
                Ok(_) => {
                    self.notifier
                        .notify(RecordChange::updated(Table::ParsingLogs, attempt.id));
                    if recovered {
                        report.recovered.push(attempt.id);
                    } else {
                        report.failed.push(attempt.id);
                    }
                }
                // Finished on its own between the list and the write.
                Err(StoreError::AlreadyResolved { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        if !report.is_empty() {
            warn!(
                failed = report.failed.len(),
                recovered = report.recovered.len(),
                "Resolved stale extraction attempts"
            );
        }
        Ok(report)
    }

    /// Apply a manual edit to a shipment and announce it.
    #[instrument(skip(self, update))]
    pub async fn edit_shipment(
        &self,
        id: Uuid,
        update: ShipmentUpdate,
    ) -> StoreResult<ShipmentRecord> {
        let record = self.records.update_shipment(id, update).await?;
        self.notifier
            .notify(RecordChange::updated(Table::ShipmentOrders, record.id));
        info!(shipment_id = %record.id, "Updated shipment");
        Ok(record)
    }
}

fn shipment_snapshot(record: &ShipmentRecord) -> Value {
    json!({
        "customer_name": record.customer_name,
        "address": record.address,
        "tracking_id": record.tracking_id,
        "delivery_date": record.delivery_date,
        "package_weight": record.package_weight,
        "notes": record.notes,
    })
}
