// Main entry point for the shipment intake API server

use std::time::Duration;

use anyhow::{Context, Result};
use server_core::{
    kernel::{build_state, start_scheduler},
    server::{build_app, AppOptions},
    Config,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,intake=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting shipment intake API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(model = %config.extraction_model, "Configuration loaded");

    let state = build_state(&config).await?;

    // Held for the process lifetime
    let _scheduler = start_scheduler(state.extractor().clone(), config.stale_attempt_after)
        .await
        .context("Failed to start scheduler")?;

    let options = AppOptions {
        allowed_origins: config.allowed_origins.clone(),
        request_timeout: config.extraction_timeout + Duration::from_secs(30),
        max_body_bytes: config.max_upload_bytes,
    };
    let app = build_app(state, &options);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
