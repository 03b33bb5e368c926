//! Scripted chat model for tests and offline dry runs
//!
//! [`MockChatModel`] replays a queue of canned responses and failures in
//! order, then falls back to an optional responder closure. Every prompt it
//! receives is recorded so tests can assert on call counts and contents.
//!
//! # Example
//!
//! ```
//! use mcqbench_core::mock_llm::MockChatModel;
//! use mcqbench_core::{ChatModel, LlmError};
//!
//! # async fn example() {
//! let mock = MockChatModel::new()
//!     .fail(LlmError::RateLimit("slow down".into()))
//!     .respond("ANSWER: B");
//!
//! assert!(mock.complete("q").await.is_err());
//! assert_eq!(mock.complete("q").await.unwrap(), "ANSWER: B");
//! assert_eq!(mock.call_count(), 2);
//! # }
//! ```

use crate::error::LlmError;
use crate::llm::ChatModel;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

type Responder = Box<dyn Fn(&str) -> Result<String, LlmError> + Send + Sync>;

/// Chat model that replays scripted outcomes
pub struct MockChatModel {
    model: String,

    /// Outcomes returned first, in order
    script: Mutex<VecDeque<Result<String, LlmError>>>,

    /// Used once the script is exhausted
    responder: Option<Responder>,

    /// Every prompt received, in order
    prompts: Mutex<Vec<String>>,

    calls: AtomicUsize,
}

impl std::fmt::Debug for MockChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockChatModel")
            .field("model", &self.model)
            .field("calls", &self.call_count())
            .field("has_responder", &self.responder.is_some())
            .finish()
    }
}

impl Default for MockChatModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChatModel {
    /// Create an empty mock named `mock-model`.
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            script: Mutex::new(VecDeque::new()),
            responder: None,
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock that answers every prompt with `responder`.
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::new()
        }
    }

    /// Set the reported model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Queue a successful response.
    #[must_use]
    pub fn respond(self, text: impl Into<String>) -> Self {
        lock(&self.script).push_back(Ok(text.into()));
        self
    }

    /// Queue a failure.
    #[must_use]
    pub fn fail(self, error: LlmError) -> Self {
        lock(&self.script).push_back(Err(error));
        self
    }

    /// Number of `complete` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Copy of every prompt received.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Scripted outcomes not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.prompts).push(prompt.to_string());

        if let Some(outcome) = lock(&self.script).pop_front() {
            return outcome;
        }

        match &self.responder {
            Some(responder) => responder(prompt),
            None => Err(LlmError::Other("Mock script exhausted".to_string())),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Mock lock poisoned - recovering");
            poisoned.into_inner()
        }
    }
}
