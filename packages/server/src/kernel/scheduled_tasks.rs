//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! ```text
//! Scheduler (every minute)
//!     │
//!     └─► reap_stale_attempts(max_age)
//!             ├─► shipment exists → attempt marked success
//!             └─► otherwise      → attempt marked failed
//! ```

use std::time::Duration;

use anyhow::Result;
use intake::{ExtractionService, ReapReport};
use tokio_cron_scheduler::{Job, JobScheduler};

/// Start all scheduled tasks
pub async fn start_scheduler(
    extractor: ExtractionService,
    stale_after: Duration,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let reap_job = Job::new_async("0 * * * * *", move |_uuid, _lock| {
        let extractor = extractor.clone();
        Box::pin(async move {
            if let Err(e) = reap_once(&extractor, stale_after).await {
                tracing::error!("Stale attempt sweep failed: {}", e);
            }
        })
    })?;

    scheduler.add(reap_job).await?;
    scheduler.start().await?;

    tracing::info!(
        stale_after_secs = stale_after.as_secs(),
        "Scheduled tasks started (stale attempt sweep every minute)"
    );
    Ok(scheduler)
}

/// Resolve attempts left in `processing` for longer than `stale_after`.
pub async fn reap_once(extractor: &ExtractionService, stale_after: Duration) -> Result<ReapReport> {
    let report = extractor.reap_stale_attempts(stale_after).await?;

    if report.is_empty() {
        tracing::debug!("No stale attempts");
    } else {
        tracing::info!(
            failed = report.failed.len(),
            recovered = report.recovered.len(),
            "Stale attempts resolved"
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use intake::{
        AttemptLog, AttemptStatus, ExtractionAttempt, ExtractionConfig, MemoryRecordStore,
        MockModel, NoopNotifier,
    };

    #[tokio::test]
    async fn test_reap_once_fails_abandoned_attempts() {
        let records = Arc::new(MemoryRecordStore::new());
        let extractor = ExtractionService::new(
            records.clone(),
            Arc::new(MockModel::new()),
            Arc::new(NoopNotifier),
            ExtractionConfig::default(),
        );

        let mut old = ExtractionAttempt::new("old.txt", None);
        old.created_at = chrono::Utc::now() - chrono::Duration::hours(1);
        records.insert_attempt(&old).await.unwrap();
        let fresh = ExtractionAttempt::new("fresh.txt", None);
        records.insert_attempt(&fresh).await.unwrap();

        let report = reap_once(&extractor, Duration::from_secs(15 * 60))
            .await
            .unwrap();

        assert_eq!(report.failed, vec![old.id]);
        assert!(report.recovered.is_empty());
        let old = records.get_attempt(old.id).await.unwrap().unwrap();
        assert_eq!(old.status, AttemptStatus::Failed);
        let fresh = records.get_attempt(fresh.id).await.unwrap().unwrap();
        assert_eq!(fresh.status, AttemptStatus::Processing);
    }
}
