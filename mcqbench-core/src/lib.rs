//! # mcqbench Core
//!
//! Building blocks for measuring a hosted chat model's accuracy on a
//! multiple-choice question set.
//!
//! - **Questions**: [`Question`] and the four-valued [`Letter`]
//! - **Extraction**: pull a single answer letter out of free-form text
//! - **Chat boundary**: the [`ChatModel`] trait, an HTTP implementation for
//!   OpenAI-compatible endpoints, and a scripted mock
//! - **Retries**: [`AnsweringClient`] asks (and optionally verifies) with a
//!   bounded, fixed-delay retry loop
//!
//! ## Example
//!
//! ```no_run
//! use mcqbench_core::{AnsweringClient, ClientConfig, HttpChatClient, Provider, Question};
//!
//! # async fn example(question: Question) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::for_provider(Provider::Groq);
//! let http = HttpChatClient::new(std::env::var("GROQ_API_KEY")?, config.clone())?;
//! let client = AnsweringClient::new(http, &config);
//!
//! let answer = client.ask(&question, |notice| {
//!     eprintln!("attempt {} failed: {}", notice.attempt, notice.error);
//! }).await?;
//! println!("{} (correct: {})", answer.letter, question.is_correct(answer.letter));
//! # Ok(())
//! # }
//! ```

pub mod answer;
pub mod answering;
pub mod config;
pub mod error;
pub mod llm;
pub mod mock_llm;
pub mod prompt;
pub mod question;

// Re-export public API
pub use answer::{extract_answer, extract_verdict, strip_reasoning, Verdict};
pub use answering::{Answer, AnsweringClient, RetryNotice, Verification};
pub use config::{ClientConfig, Provider};
pub use error::{AnswerError, LlmError, QuestionError};
pub use llm::{ChatModel, HttpChatClient};
pub use question::{Letter, Question};
