//! Messages API client over HTTP.

use super::{classify_api_error, ContentBlock, LlmClient, LlmError, MessageRequest, MessageResponse};
use crate::config::LlmSettings;
use crate::error::{CourseRagError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

const API_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API.
pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AnthropicClient {
    /// Create a client with an explicit key.
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Create a client reading the key from the configured environment variable.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env).map_err(|_| {
            CourseRagError::Config(format!("{} is not set", settings.api_key_env))
        })?;

        Self::new(
            &settings.base_url,
            api_key,
            Duration::from_secs(settings.timeout_secs),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    #[instrument(skip_all, fields(model = %request.model, messages = request.messages.len()))]
    async fn create_message(
        &self,
        request: &MessageRequest,
    ) -> std::result::Result<MessageResponse, LlmError> {
        let response = self
            .http
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_api_error(status.as_u16(), &body));
        }

        let mut message: MessageResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        message
            .content
            .retain(|block| !matches!(block, ContentBlock::Unsupported));

        debug!(
            "Model stopped with {:?} ({} content blocks)",
            message.stop_reason,
            message.content.len()
        );
        Ok(message)
    }
}
