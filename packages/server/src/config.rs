use anyhow::{ensure, Context, Result};
use intake::ExtractionConfig;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Postgres URL; the in-memory store is used when unset
    pub database_url: Option<String>,
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub extraction_model: String,
    pub extraction_timeout: Duration,
    pub upload_dir: PathBuf,
    pub upload_public_base_url: String,
    pub max_upload_bytes: usize,
    /// Empty means any origin
    pub allowed_origins: Vec<String>,
    pub stale_attempt_after: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let config = Self {
            port: parse_or(&var, "PORT", 8080)?,
            database_url: var("DATABASE_URL"),
            openai_api_key: var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            openai_base_url: var("OPENAI_BASE_URL"),
            extraction_model: var("EXTRACTION_MODEL")
                .unwrap_or_else(|| intake::types::config::DEFAULT_MODEL.to_string()),
            extraction_timeout: Duration::from_secs(parse_or(&var, "EXTRACTION_TIMEOUT_SECS", 30)?),
            upload_dir: var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            upload_public_base_url: var("UPLOAD_PUBLIC_BASE_URL")
                .unwrap_or_else(|| "/files".to_string()),
            max_upload_bytes: parse_or(&var, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            allowed_origins: var("ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            stale_attempt_after: Duration::from_secs(
                60 * parse_or(&var, "STALE_ATTEMPT_MINUTES", 15u64)?,
            ),
        };

        let floor = ExtractionConfig::default()
            .with_request_timeout(config.extraction_timeout)
            .min_stale_age();
        ensure!(
            config.stale_attempt_after >= floor,
            "STALE_ATTEMPT_MINUTES must cover EXTRACTION_TIMEOUT_SECS plus {}s ({}s needed)",
            floor.saturating_sub(config.extraction_timeout).as_secs(),
            floor.as_secs()
        );

        Ok(config)
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(name) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a valid number")),
        None => Ok(default),
    }
}
