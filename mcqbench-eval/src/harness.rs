//! Sequential evaluation loop.
//!
//! The [`EvalHarness`] walks a question set in order, skips ids already in
//! the results file, and for every remaining question asks (and optionally
//! verifies), scores, and persists before moving on.

use crate::dataset::{DatasetError, QuestionSet};
use crate::results::{EvalMode, Metadata, Record};
use crate::store::{ResultsStore, StoreError};
use crate::transcripts::TranscriptStore;
use mcqbench_core::{AnswerError, AnsweringClient, ChatModel, Letter, Question, Verdict};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors that end a run.
///
/// Per-question failures are not errors; they skip the question.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EvalError {
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// Reading or writing the results file failed
    #[error("Persistence error: {0}")]
    Store(#[from] StoreError),

    #[error(
        "{} holds results for model '{recorded}', not '{requested}'; \
         choose another --results-file",
        file.display()
    )]
    ModelMismatch {
        file: PathBuf,
        recorded: String,
        requested: String,
    },

    #[error(
        "{} holds records from another mode than {mode}; choose another --results-file",
        file.display()
    )]
    ModeMismatch { file: PathBuf, mode: EvalMode },
}

/// Which request a progress event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Answer,
    Verification,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::Answer => write!(f, "answer"),
            Pass::Verification => write!(f, "verification"),
        }
    }
}

/// Progress events emitted during a run.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum EvalProgress {
    /// Results file loaded, loop starting.
    Started {
        total: usize,
        already_processed: usize,
        /// Questions this run will attempt
        pending: usize,
    },
    QuestionStarted {
        id: u64,
        /// 1-based position among this run's pending questions
        position: usize,
        pending: usize,
    },
    /// An attempt failed and will be retried.
    Retrying {
        id: u64,
        pass: Pass,
        attempt: u32,
        max_attempts: u32,
        kind: &'static str,
        message: String,
    },
    /// A letter was accepted.
    Answered {
        id: u64,
        pass: Pass,
        letter: Letter,
        attempts: u32,
    },
    /// The record was written; `metadata` is the post-write header.
    Recorded { record: Record, metadata: Metadata },
    /// Every attempt failed; nothing was recorded for `id`.
    Skipped {
        id: u64,
        pass: Pass,
        kind: &'static str,
        message: String,
    },
}

/// Configuration for the evaluation loop.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct EvalConfig {
    pub mode: EvalMode,

    /// Pause after each recorded question (default: 1s)
    pub question_delay: Duration,

    /// Cap on questions attempted this run
    pub limit: Option<usize>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            mode: EvalMode::SinglePass,
            question_delay: Duration::from_secs(1),
            limit: None,
        }
    }
}

impl EvalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_mode(mut self, mode: EvalMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_question_delay(mut self, delay: Duration) -> Self {
        self.question_delay = delay;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every pending question was attempted.
    Completed,
    /// Stopped between questions by the cancellation token.
    Interrupted,
}

/// Summary returned by [`EvalHarness::run`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub mode: EvalMode,
    pub results_path: PathBuf,
    /// Records written by this run
    pub processed_this_run: usize,
    /// Ids that exhausted their attempts, in order
    pub skipped: Vec<u64>,
    /// Header of the results file at the end of the run
    pub metadata: Metadata,
}

/// Where a run reads and writes.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub results: PathBuf,
    pub transcripts: Option<PathBuf>,
}

impl RunPaths {
    pub fn new(results: impl Into<PathBuf>) -> Self {
        Self {
            results: results.into(),
            transcripts: None,
        }
    }

    #[must_use]
    pub fn with_transcripts(mut self, path: impl Into<PathBuf>) -> Self {
        self.transcripts = Some(path.into());
        self
    }
}

/// Evaluation loop driver.
///
/// # Example
///
/// ```no_run
/// use mcqbench_core::mock_llm::MockChatModel;
/// use mcqbench_core::AnsweringClient;
/// use mcqbench_eval::{EvalConfig, EvalHarness, QuestionSet, RunPaths};
/// use std::path::Path;
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let questions = QuestionSet::load(Path::new("gpqa_questions.json")).await?;
/// let client = AnsweringClient::with_policy(
///     MockChatModel::from_fn(|_| Ok("ANSWER: A".into())),
///     3,
///     Duration::ZERO,
/// );
///
/// let harness = EvalHarness::new(EvalConfig::default());
/// let report = harness
///     .run(
///         &client,
///         &questions,
///         &RunPaths::new("results.json"),
///         &CancellationToken::new(),
///         |_| {},
///     )
///     .await?;
/// println!("{:.2}%", report.metadata.accuracy);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct EvalHarness {
    config: EvalConfig,
}

impl EvalHarness {
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Run the loop until the question set is exhausted or `cancel` fires.
    ///
    /// Cancellation is checked between questions, so the question in flight
    /// when it fires is still finished and recorded.
    ///
    /// # Errors
    ///
    /// Fails on a results file that cannot be read or written, or one
    /// recorded for a different model. Per-question failures are reported
    /// as [`EvalProgress::Skipped`] and the loop moves on.
    pub async fn run<M, F>(
        &self,
        client: &AnsweringClient<M>,
        questions: &QuestionSet,
        paths: &RunPaths,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<RunReport, EvalError>
    where
        M: ChatModel,
        F: FnMut(EvalProgress),
    {
        let mode = self.config.mode;
        let model = client.model_name();

        let mut store =
            ResultsStore::load_or_init(&paths.results, model, questions.len(), mode).await?;
        if store.metadata().model != model {
            return Err(EvalError::ModelMismatch {
                file: paths.results.clone(),
                recorded: store.metadata().model.clone(),
                requested: model.to_string(),
            });
        }
        if store.records().iter().any(|r| r.mode() != mode) {
            return Err(EvalError::ModeMismatch {
                file: paths.results.clone(),
                mode,
            });
        }
        store.flush().await?;

        let mut transcripts = match &paths.transcripts {
            Some(path) => match TranscriptStore::load_or_init(path, model).await {
                Ok(t) => Some(t),
                Err(e) => {
                    log::warn!("Transcripts disabled for this run: {}", e);
                    None
                }
            },
            None => None,
        };

        let pending: Vec<&Question> = questions
            .iter()
            .filter(|q| !store.has_processed(q.id))
            .take(self.config.limit.unwrap_or(usize::MAX))
            .collect();

        log::info!(
            "Evaluating {} of {} questions with {} ({} mode)",
            pending.len(),
            questions.len(),
            model,
            mode
        );
        on_progress(EvalProgress::Started {
            total: questions.len(),
            already_processed: store.replay_set().len(),
            pending: pending.len(),
        });

        let mut outcome = RunOutcome::Completed;
        let mut processed_this_run = 0;
        let mut skipped = Vec::new();

        for (index, question) in pending.iter().enumerate() {
            if cancel.is_cancelled() {
                outcome = RunOutcome::Interrupted;
                break;
            }

            on_progress(EvalProgress::QuestionStarted {
                id: question.id,
                position: index + 1,
                pending: pending.len(),
            });

            let acquired = self
                .acquire(client, question, &mut on_progress)
                .await;
            let (record, analysis, verification) = match acquired {
                Ok(parts) => parts,
                Err((pass, error)) => {
                    log::warn!(
                        "Skipping question {} ({} pass): {}",
                        question.id,
                        pass,
                        error
                    );
                    on_progress(EvalProgress::Skipped {
                        id: question.id,
                        pass,
                        kind: error.root_cause().kind(),
                        message: error.root_cause().to_string(),
                    });
                    skipped.push(question.id);
                    continue;
                }
            };

            let metadata = store.append_and_persist(record.clone()).await?.clone();
            processed_this_run += 1;

            if let Some(transcripts) = transcripts.as_mut() {
                if let Err(e) = transcripts
                    .record(question.id, &analysis, verification.as_deref())
                    .await
                {
                    log::warn!(
                        "Failed to save responses for question {} to {}: {}",
                        question.id,
                        transcripts.path().display(),
                        e
                    );
                }
            }

            on_progress(EvalProgress::Recorded { record, metadata });

            let is_last = index + 1 == pending.len();
            if !is_last && !self.config.question_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.question_delay) => {}
                    _ = cancel.cancelled() => {}
                }
            }
        }

        if outcome == RunOutcome::Interrupted {
            log::info!(
                "Interrupted after {} question(s); resume by running again",
                processed_this_run
            );
        }

        Ok(RunReport {
            outcome,
            mode,
            results_path: paths.results.clone(),
            processed_this_run,
            skipped,
            metadata: store.metadata().clone(),
        })
    }

    /// Ask, verify in verified mode, and build the scored record.
    async fn acquire<M, F>(
        &self,
        client: &AnsweringClient<M>,
        question: &Question,
        on_progress: &mut F,
    ) -> Result<(Record, String, Option<String>), (Pass, AnswerError)>
    where
        M: ChatModel,
        F: FnMut(EvalProgress),
    {
        let id = question.id;

        let answer = client
            .ask(question, |notice| {
                on_progress(retrying(id, Pass::Answer, notice));
            })
            .await
            .map_err(|e| (Pass::Answer, e))?;
        on_progress(EvalProgress::Answered {
            id,
            pass: Pass::Answer,
            letter: answer.letter,
            attempts: answer.attempts,
        });

        if !self.config.mode.is_verified() {
            let record = Record::single_pass(id, answer.letter, question.correct_answer);
            return Ok((record, answer.response, None));
        }

        let verification = client
            .verify(question, &answer, |notice| {
                on_progress(retrying(id, Pass::Verification, notice));
            })
            .await
            .map_err(|e| (Pass::Verification, e))?;
        on_progress(EvalProgress::Answered {
            id,
            pass: Pass::Verification,
            letter: verification.letter(),
            attempts: verification.attempts,
        });

        let self_reported_change = match verification.verdict {
            Verdict::Verified(_) => Some(false),
            Verdict::Changed(_) => Some(true),
            Verdict::Unmarked(_) => None,
        };
        let changed = verification.letter() != answer.letter;
        if self_reported_change.is_some_and(|reported| reported != changed) {
            log::info!(
                "Question {}: verifier said {:?} but {} -> {}; scoring on the letters",
                id,
                verification.verdict,
                answer.letter,
                verification.letter()
            );
        }

        let record = Record::verified(
            id,
            answer.letter,
            verification.letter(),
            question.correct_answer,
        );
        Ok((record, answer.response, Some(verification.response)))
    }
}

fn retrying(id: u64, pass: Pass, notice: &mcqbench_core::RetryNotice<'_>) -> EvalProgress {
    EvalProgress::Retrying {
        id,
        pass,
        attempt: notice.attempt,
        max_attempts: notice.max_attempts,
        kind: notice.error.kind(),
        message: notice.error.to_string(),
    }
}
