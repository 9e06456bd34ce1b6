//! OpenAI implementation of the extraction model.
//!
//! # Example
//!
//! ```rust,ignore
//! use intake::ai::OpenAIModel;
//! use openai_client::OpenAIClient;
//!
//! let model = OpenAIModel::new(OpenAIClient::from_env()?);
//! let service = ExtractionService::new(records, Arc::new(model), notifier, config);
//! ```

use async_trait::async_trait;
use openai_client::{ChatRequest, Message, OpenAIClient, OpenAIError};

use crate::error::{ModelError, ModelResult};
use crate::traits::model::{CompletionRequest, ExtractionModel};

/// Chat-completion backed extraction model.
#[derive(Clone)]
pub struct OpenAIModel {
    client: OpenAIClient,
}

impl OpenAIModel {
    pub fn new(client: OpenAIClient) -> Self {
        Self { client }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> ModelResult<Self> {
        OpenAIClient::from_env().map(Self::new).map_err(Into::into)
    }

    pub fn client(&self) -> &OpenAIClient {
        &self.client
    }
}

#[async_trait]
impl ExtractionModel for OpenAIModel {
    async fn complete(&self, request: &CompletionRequest) -> ModelResult<String> {
        let chat = ChatRequest::new(&request.model)
            .message(Message::system(&request.system))
            .message(Message::user(&request.user))
            .temperature(request.temperature)
            .token_budget(request.max_tokens);

        let response = self.client.chat_completion(chat).await?;
        Ok(response.content)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

impl From<OpenAIError> for ModelError {
    fn from(e: OpenAIError) -> Self {
        match e {
            OpenAIError::Config(message) => ModelError::Config(message),
            OpenAIError::Timeout(after) => ModelError::Timeout(after),
            OpenAIError::Api { status, message } => ModelError::Upstream {
                status: Some(status),
                message,
            },
            OpenAIError::Network(message) | OpenAIError::Parse(message) => ModelError::Upstream {
                status: None,
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_mapping_keeps_status() {
        let err: ModelError = OpenAIError::Api {
            status: 429,
            message: "rate limited".into(),
        }
        .into();
        assert_eq!(err.to_string(), "upstream returned status 429: rate limited");

        let timeout: ModelError = OpenAIError::Timeout(Duration::from_secs(30)).into();
        assert!(matches!(timeout, ModelError::Timeout(_)));
    }
}
