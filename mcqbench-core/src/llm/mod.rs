//! Chat model boundary.
//!
//! The benchmark only needs one capability from a provider: send a prompt,
//! get text back. [`ChatModel`] is that seam; [`HttpChatClient`] implements
//! it against any OpenAI-compatible chat-completions endpoint, and
//! [`MockChatModel`](crate::mock_llm::MockChatModel) implements it for tests.
//!
//! # Example
//!
//! ```no_run
//! use mcqbench_core::{ChatModel, ClientConfig, HttpChatClient, Provider};
//!
//! # async fn example() -> Result<(), mcqbench_core::LlmError> {
//! let config = ClientConfig::for_provider(Provider::Groq);
//! let client = HttpChatClient::new("api-key", config)?;
//! let text = client.complete("What is the capital of France?").await?;
//! println!("{}", text);
//! # Ok(())
//! # }
//! ```

mod client;
mod request;

pub use client::HttpChatClient;
pub use request::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

use crate::error::LlmError;
use async_trait::async_trait;
use std::sync::Arc;

/// A remote model that turns a single user prompt into free-form text.
///
/// One call is one request; retrying is the caller's job.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier recorded in results.
    fn model(&self) -> &str;

    /// Send one prompt and return the full response text.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

#[async_trait]
impl<T: ChatModel + ?Sized> ChatModel for Arc<T> {
    fn model(&self) -> &str {
        (**self).model()
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        (**self).complete(prompt).await
    }
}
