//! Configuration types for ingestion and extraction.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default model for the extraction call.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Configuration for the extraction call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Chat model identifier.
    pub model: String,

    /// Sampling temperature. Kept low so output is near-deterministic.
    ///
    /// Default: 0.1.
    pub temperature: f32,

    /// Output token budget for the completion.
    ///
    /// Default: 1000.
    pub max_tokens: u32,

    /// Hard bound on the model call. Exceeding it is an upstream failure.
    ///
    /// Default: 30 seconds.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,

    /// Accept output wrapped in a markdown code fence.
    ///
    /// Default: false (the response must be bare JSON).
    pub strip_code_fences: bool,

    /// Extra age past `request_timeout` before an attempt still in
    /// `processing` counts as abandoned.
    ///
    /// Default: 60 seconds.
    #[serde(with = "duration_secs")]
    pub reap_grace: Duration,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_tokens: 1000,
            request_timeout: Duration::from_secs(30),
            strip_code_fences: false,
            reap_grace: Duration::from_secs(60),
        }
    }
}

impl ExtractionConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the output token budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Accept fenced JSON output.
    pub fn with_strip_code_fences(mut self, strip: bool) -> Self {
        self.strip_code_fences = strip;
        self
    }

    pub fn with_reap_grace(mut self, grace: Duration) -> Self {
        self.reap_grace = grace;
        self
    }

    /// Youngest age at which a `processing` attempt may be reaped.
    pub fn min_stale_age(&self) -> Duration {
        self.request_timeout + self.reap_grace
    }
}

/// Configuration for the ingestion adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Largest accepted upload in bytes.
    ///
    /// Default: 10 MiB.
    pub max_file_bytes: usize,

    /// Prefix of the synthetic name given to pasted text.
    ///
    /// Default: "pasted_text".
    pub text_name_prefix: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            text_name_prefix: "pasted_text".to_string(),
        }
    }
}

impl IngestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_file_bytes(mut self, max: usize) -> Self {
        self.max_file_bytes = max;
        self
    }

    pub fn with_text_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.text_name_prefix = prefix.into();
        self
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_near_deterministic() {
        let config = ExtractionConfig::default();
        assert!(config.temperature <= 0.2);
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(!config.strip_code_fences);
        assert_eq!(config.min_stale_age(), Duration::from_secs(90));
    }

    #[test]
    fn test_builder() {
        let config = ExtractionConfig::new()
            .with_model("gpt-4o")
            .with_request_timeout(Duration::from_secs(5));
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.request_timeout, Duration::from_secs(5));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["request_timeout"], 5);
    }
}
