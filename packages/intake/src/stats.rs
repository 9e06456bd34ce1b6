//! Monitoring counters over the record store.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::StoreResult;
use crate::traits::store::RecordStore;
use crate::types::{
    attempt::AttemptStatus,
    shipment::{ShipmentFilter, ShipmentStatus},
};

/// Snapshot of shipment and attempt counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntakeStats {
    pub total_shipments: u64,
    pub shipments_by_status: BTreeMap<&'static str, u64>,
    pub ai_parsed_shipments: u64,
    pub total_attempts: u64,
    pub attempts_by_status: BTreeMap<&'static str, u64>,

    /// Successful attempts over resolved attempts; `None` until one resolves
    pub success_rate: Option<f64>,
}

impl IntakeStats {
    /// Count everything. Each number is its own query, so the snapshot is
    /// not transactionally consistent.
    pub async fn collect(store: &dyn RecordStore) -> StoreResult<Self> {
        let total_shipments = store.count_shipments(&ShipmentFilter::new()).await?;

        let mut shipments_by_status = BTreeMap::new();
        for status in ShipmentStatus::ALL {
            let count = store
                .count_shipments(&ShipmentFilter::new().with_status(status))
                .await?;
            shipments_by_status.insert(status.as_str(), count);
        }

        let ai_parsed_shipments = store
            .count_shipments(&ShipmentFilter::new().with_parsed_by_ai(true))
            .await?;

        let total_attempts = store.count_attempts(None).await?;

        let mut attempts_by_status = BTreeMap::new();
        for status in AttemptStatus::ALL {
            attempts_by_status.insert(status.as_str(), store.count_attempts(Some(status)).await?);
        }

        let succeeded = attempts_by_status[AttemptStatus::Success.as_str()];
        let resolved = succeeded + attempts_by_status[AttemptStatus::Failed.as_str()];
        let success_rate = (resolved > 0).then(|| succeeded as f64 / resolved as f64);

        Ok(Self {
            total_shipments,
            shipments_by_status,
            ai_parsed_shipments,
            total_attempts,
            attempts_by_status,
            success_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryRecordStore;
    use crate::traits::store::{AttemptLog, ShipmentStore};
    use crate::types::attempt::{AttemptResolution, ExtractionAttempt};
    use crate::types::shipment::{ShipmentPayload, ShipmentRecord, ShipmentSource};
    use serde_json::json;

    #[tokio::test]
    async fn test_empty_store() {
        let stats = IntakeStats::collect(&MemoryRecordStore::new()).await.unwrap();
        assert_eq!(stats.total_shipments, 0);
        assert_eq!(stats.success_rate, None);
        assert_eq!(stats.shipments_by_status["pending"], 0);
    }

    #[tokio::test]
    async fn test_counts_and_success_rate() {
        let store = MemoryRecordStore::new();

        for (i, ok) in [true, true, false].into_iter().enumerate() {
            let attempt = ExtractionAttempt::new(format!("{i}.txt"), None);
            store.insert_attempt(&attempt).await.unwrap();
            let resolution = if ok {
                AttemptResolution::success(json!({}))
            } else {
                AttemptResolution::failed("nope", None)
            };
            store.resolve_attempt(attempt.id, resolution).await.unwrap();
        }
        store
            .insert_attempt(&ExtractionAttempt::new("pending.txt", None))
            .await
            .unwrap();

        let mut manual = ShipmentRecord::from_payload(
            ShipmentPayload {
                customer_name: "Ann".into(),
                address: "1 Main St".into(),
                tracking_id: None,
                delivery_date: None,
                package_weight: None,
                notes: None,
            },
            ShipmentSource::default(),
        );
        manual.parsed_by_ai = false;
        store.insert_shipment(&manual).await.unwrap();

        let stats = IntakeStats::collect(&store).await.unwrap();
        assert_eq!(stats.total_attempts, 4);
        assert_eq!(stats.attempts_by_status["processing"], 1);
        assert_eq!(stats.success_rate, Some(2.0 / 3.0));
        assert_eq!(stats.total_shipments, 1);
        assert_eq!(stats.ai_parsed_shipments, 0);
        assert_eq!(stats.shipments_by_status["pending"], 1);
    }
}
