//! Retrying answer acquisition.
//!
//! [`AnsweringClient`] wraps a [`ChatModel`] with a bounded retry loop. A
//! transport failure and an unparseable response are treated the same way:
//! both consume one attempt, and both are followed by the same fixed pause.

use crate::answer::{excerpt, extract_answer, extract_verdict, Verdict};
use crate::config::ClientConfig;
use crate::error::AnswerError;
use crate::llm::ChatModel;
use crate::prompt::{answer_prompt, verification_prompt};
use crate::question::{Letter, Question};
use std::time::Duration;

/// Characters of a bad response kept in [`AnswerError::InvalidAnswerFormat`].
const EXCERPT_CHARS: usize = 160;

/// An accepted first-pass answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub letter: Letter,
    /// Full response text the letter was extracted from
    pub response: String,
    /// Attempts used, including the successful one
    pub attempts: u32,
}

/// An accepted verification-pass answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub verdict: Verdict,
    pub response: String,
    pub attempts: u32,
}

impl Verification {
    pub fn letter(&self) -> Letter {
        self.verdict.letter()
    }
}

/// Passed to the retry callback after a failed attempt that will be retried.
#[derive(Debug)]
pub struct RetryNotice<'a> {
    /// The attempt that just failed (1-based)
    pub attempt: u32,
    pub max_attempts: u32,
    pub error: &'a AnswerError,
}

/// Chat model plus a fixed-delay, bounded retry policy.
#[derive(Debug)]
pub struct AnsweringClient<M> {
    model: M,
    max_attempts: u32,
    retry_delay: Duration,
}

impl<M: ChatModel> AnsweringClient<M> {
    /// Create a client using the retry policy from `config`.
    pub fn new(model: M, config: &ClientConfig) -> Self {
        Self::with_policy(model, config.max_attempts, config.retry_delay)
    }

    /// Create a client with an explicit retry policy.
    pub fn with_policy(model: M, max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            model,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    /// Identifier of the wrapped model.
    pub fn model_name(&self) -> &str {
        self.model.model()
    }

    /// Get a reference to the wrapped model.
    pub fn inner(&self) -> &M {
        &self.model
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Ask the model to answer `question`.
    ///
    /// # Errors
    ///
    /// [`AnswerError::MaxRetriesExceeded`] once every attempt has failed,
    /// wrapping the failure of the final attempt.
    pub async fn ask<F>(&self, question: &Question, on_retry: F) -> Result<Answer, AnswerError>
    where
        F: FnMut(&RetryNotice<'_>),
    {
        let prompt = answer_prompt(question);
        let (letter, response, attempts) = self
            .with_retries(&prompt, extract_answer, on_retry)
            .await?;
        Ok(Answer {
            letter,
            response,
            attempts,
        })
    }

    /// Ask the model to verify (and possibly revise) an earlier answer.
    ///
    /// Uses its own attempt budget, independent of the first pass.
    pub async fn verify<F>(
        &self,
        question: &Question,
        original: &Answer,
        on_retry: F,
    ) -> Result<Verification, AnswerError>
    where
        F: FnMut(&RetryNotice<'_>),
    {
        let prompt = verification_prompt(question, &original.response, original.letter);
        let (verdict, response, attempts) = self
            .with_retries(&prompt, extract_verdict, on_retry)
            .await?;
        Ok(Verification {
            verdict,
            response,
            attempts,
        })
    }

    async fn with_retries<T, P, F>(
        &self,
        prompt: &str,
        parse: P,
        mut on_retry: F,
    ) -> Result<(T, String, u32), AnswerError>
    where
        P: Fn(&str) -> Option<T>,
        F: FnMut(&RetryNotice<'_>),
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match self.model.complete(prompt).await {
                Ok(text) => match parse(&text) {
                    Some(value) => return Ok((value, text, attempt)),
                    None => AnswerError::InvalidAnswerFormat {
                        excerpt: excerpt(&text, EXCERPT_CHARS),
                    },
                },
                Err(e) => AnswerError::Transport(e),
            };

            if attempt >= self.max_attempts {
                return Err(AnswerError::MaxRetriesExceeded {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            log::warn!(
                "Attempt {}/{} failed: {}, retrying...",
                attempt,
                self.max_attempts,
                error
            );
            on_retry(&RetryNotice {
                attempt,
                max_attempts: self.max_attempts,
                error: &error,
            });

            if !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::mock_llm::MockChatModel;
    use std::collections::BTreeMap;

    fn question() -> Question {
        Question {
            id: 9,
            text: "Pick B".to_string(),
            options: Letter::ALL
                .into_iter()
                .map(|l| (l, format!("option {}", l)))
                .collect::<BTreeMap<_, _>>(),
            correct_answer: Letter::B,
        }
    }

    fn client(mock: MockChatModel) -> AnsweringClient<MockChatModel> {
        AnsweringClient::with_policy(mock, 3, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_first_attempt_succeeds() {
        let client = client(MockChatModel::new().respond("Thinking...\nANSWER: B"));
        let mut retries = 0;

        let answer = client.ask(&question(), |_| retries += 1).await.unwrap();

        assert_eq!(answer.letter, Letter::B);
        assert_eq!(answer.attempts, 1);
        assert_eq!(retries, 0);
        assert_eq!(client.inner().call_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_then_success() {
        let mock = MockChatModel::new()
            .fail(LlmError::RateLimit("busy".into()))
            .respond("ANSWER: C");
        let client = client(mock);
        let mut notices = Vec::new();

        let answer = client
            .ask(&question(), |n| notices.push((n.attempt, n.error.kind())))
            .await
            .unwrap();

        assert_eq!(answer.letter, Letter::C);
        assert_eq!(answer.attempts, 2);
        assert_eq!(notices, vec![(1, "TransportError")]);
    }

    #[tokio::test]
    async fn test_invalid_format_shares_budget() {
        let mock = MockChatModel::new()
            .respond("I am not sure.")
            .fail(LlmError::Timeout(10))
            .respond("Still unsure, maybe B or C.");
        let client = client(mock);

        let err = client.ask(&question(), |_| {}).await.unwrap_err();

        match err {
            AnswerError::MaxRetriesExceeded { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, AnswerError::InvalidAnswerFormat { .. }));
            }
            other => panic!("Expected MaxRetriesExceeded, got {:?}", other),
        }
        assert_eq!(client.inner().call_count(), 3);
    }

    #[tokio::test]
    async fn test_single_attempt_policy() {
        let client = AnsweringClient::with_policy(
            MockChatModel::new().fail(LlmError::NoContent),
            1,
            Duration::ZERO,
        );
        let err = client.ask(&question(), |_| {}).await.unwrap_err();
        assert!(matches!(
            err,
            AnswerError::MaxRetriesExceeded { attempts: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_verify_passes_original_response() {
        let mock = MockChatModel::new().respond("Agreed.\nVERIFIED: B");
        let client = client(mock);
        let original = Answer {
            letter: Letter::B,
            response: "Because reasons.\nANSWER: B".to_string(),
            attempts: 1,
        };

        let verification = client.verify(&question(), &original, |_| {}).await.unwrap();

        assert_eq!(verification.verdict, Verdict::Verified(Letter::B));
        let prompts = client.inner().prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Because reasons."));
        assert!(prompts[0].contains("Original answer extracted: B"));
    }
}
