//! # mcqbench Eval
//!
//! Resumable accuracy runs of a chat model over a multiple-choice question set.
//!
//! ## Overview
//!
//! - **Dataset**: load and validate the question file ([`QuestionSet`])
//! - **Results**: the persisted document and its pure [`recompute`]
//! - **Store**: atomic, resumable persistence ([`ResultsStore`])
//! - **Transcripts**: optional full-text response log ([`TranscriptStore`])
//! - **Harness**: the sequential ask → score → persist loop ([`EvalHarness`])
//!
//! ## Architecture
//!
//! ```text
//! mcqbench-core (questions, extraction, chat client, retries)
//!     ↓
//! mcqbench-eval (dataset, results store, harness, CLI)  ← this crate
//! ```
//!
//! ## Resuming
//!
//! A run writes the whole results document after every question. Running
//! again against the same file skips every id already recorded, so an
//! interrupted run picks up where it stopped and a finished run makes no
//! requests at all.
//!
//! ```no_run
//! use mcqbench_core::{AnsweringClient, ClientConfig, HttpChatClient, Provider};
//! use mcqbench_eval::{EvalConfig, EvalHarness, EvalMode, QuestionSet, RunPaths};
//! use std::path::Path;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::for_provider(Provider::Groq);
//! let http = HttpChatClient::new(std::env::var("GROQ_API_KEY")?, config.clone())?;
//! let client = AnsweringClient::new(http, &config);
//!
//! let questions = QuestionSet::load(Path::new("gpqa_questions.json")).await?;
//! let mode = EvalMode::Verified;
//! let harness = EvalHarness::new(EvalConfig::new().with_mode(mode));
//!
//! let report = harness
//!     .run(
//!         &client,
//!         &questions,
//!         &RunPaths::new(mode.default_results_file()),
//!         &CancellationToken::new(),
//!         |_| {},
//!     )
//!     .await?;
//! println!(
//!     "{} / {} correct",
//!     report.metadata.correct_answers, report.metadata.questions_processed
//! );
//! # Ok(())
//! # }
//! ```

pub mod dataset;
pub mod harness;
pub mod results;
pub mod store;
pub mod transcripts;

// Re-export public API
pub use dataset::{DatasetError, QuestionSet};
pub use harness::{
    EvalConfig, EvalError, EvalHarness, EvalProgress, Pass, RunOutcome, RunPaths, RunReport,
};
pub use results::{
    now_iso, recompute, Aggregates, EvalMode, Metadata, Record, ResultsDocument,
    SinglePassRecord, VerifiedRecord,
};
pub use store::{ResultsStore, StoreError};
pub use transcripts::{TranscriptDocument, TranscriptEntry, TranscriptStore};
