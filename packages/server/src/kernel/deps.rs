//! Wiring of concrete collaborators from configuration.
//!
//! Records go to Postgres when `DATABASE_URL` is set and to the in-memory
//! store otherwise. Uploads always land on the local filesystem.

use std::sync::Arc;

use anyhow::{Context, Result};
use intake::{
    ExtractionConfig, ExtractionModel, FileStore, IngestConfig, LocalFileStore,
    MemoryRecordStore, OpenAIModel, PostgresRecordStore, RecordStore,
};
use openai_client::OpenAIClient;
use sqlx::postgres::PgPoolOptions;

use crate::config::Config;
use crate::server::app::AppState;

/// Build application state from configuration.
pub async fn build_state(config: &Config) -> Result<AppState> {
    let files: Arc<dyn FileStore> = Arc::new(LocalFileStore::new(
        config.upload_dir.clone(),
        config.upload_public_base_url.clone(),
    ));

    let model: Arc<dyn ExtractionModel> = Arc::new(OpenAIModel::new(openai_client(config)));

    let extraction = ExtractionConfig::default()
        .with_model(config.extraction_model.clone())
        .with_request_timeout(config.extraction_timeout);
    let ingest = IngestConfig::default().with_max_file_bytes(config.max_upload_bytes);

    match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .context("Failed to connect to database")?;

            let store = PostgresRecordStore::from_pool(pool.clone())
                .await
                .context("Failed to run migrations")?;
            tracing::info!("Database connected, migrations complete");

            let records: Arc<dyn RecordStore> = Arc::new(store);
            Ok(AppState::new(records, files, model, extraction, ingest).with_db_pool(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; records are kept in memory and lost on restart");
            let records: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
            Ok(AppState::new(records, files, model, extraction, ingest))
        }
    }
}

fn openai_client(config: &Config) -> OpenAIClient {
    let client = OpenAIClient::new(config.openai_api_key.clone())
        .with_timeout(config.extraction_timeout);

    match &config.openai_base_url {
        Some(url) => client.with_base_url(url.clone()),
        None => client,
    }
}
