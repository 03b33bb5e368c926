//! HTTP chat client for OpenAI-compatible endpoints.

use super::request::{ChatCompletionRequest, ChatCompletionResponse};
use super::ChatModel;
use crate::config::ClientConfig;
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::Client;

/// Chat client wrapping reqwest with timeout and configuration.
///
/// Makes exactly one request per [`complete`](ChatModel::complete) call;
/// see [`AnsweringClient`](crate::AnsweringClient) for retries.
pub struct HttpChatClient {
    http: Client,
    api_key: String,
    config: ClientConfig,
}

impl std::fmt::Debug for HttpChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChatClient")
            .field("api_key", &"[REDACTED]")
            .field("config", &self.config)
            .finish()
    }
}

impl HttpChatClient {
    /// Create a client for the endpoint and model in `config`.
    pub fn new(api_key: impl Into<String>, config: ClientConfig) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            config,
        })
    }

    /// Get a reference to the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn map_send_error(&self, error: reqwest::Error) -> LlmError {
        if error.is_timeout() {
            LlmError::Timeout(self.config.timeout.as_millis() as u64)
        } else {
            LlmError::Http(error)
        }
    }
}

#[async_trait]
impl ChatModel for HttpChatClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let body = ChatCompletionRequest::user(&self.config, prompt);

        let resp = self
            .http
            .post(self.config.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status.as_u16(), text));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::ResponseProcessing(e.to_string()))?;

        log::debug!("Received completion from {}", self.config.model);
        parsed.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_key() {
        let client = HttpChatClient::new("secret-key", ClientConfig::default()).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_model_comes_from_config() {
        let config = ClientConfig::default().with_model("llama-test");
        let client = HttpChatClient::new("k", config).unwrap();
        assert_eq!(client.model(), "llama-test");
    }
}
