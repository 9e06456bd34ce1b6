//! Extraction model trait.
//!
//! Abstracts the one outbound call of the pipeline: a chat-style completion
//! that turns an instruction plus document text into candidate JSON.

use async_trait::async_trait;

use crate::error::ModelResult;

/// A single completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,

    /// System instruction
    pub system: String,

    /// User instruction (prompt plus document text)
    pub user: String,

    pub temperature: f32,

    /// Output token budget
    pub max_tokens: u32,
}

/// External natural-language extraction model.
///
/// Implementations return the raw text of the first completion choice.
/// They must not retry; the service records every failure as terminal.
#[async_trait]
pub trait ExtractionModel: Send + Sync {
    /// Run one completion.
    async fn complete(&self, request: &CompletionRequest) -> ModelResult<String>;

    /// Provider name (for logging).
    fn name(&self) -> &str {
        "unknown"
    }
}
