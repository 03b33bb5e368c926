//! Results document types.
//!
//! The document is the on-disk resume point for a run. Aggregates in
//! [`Metadata`] are never updated incrementally; [`recompute`] derives them
//! from the records after every append.

use mcqbench_core::Letter;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Timestamp format written to results and transcript files.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Current local time as an ISO-8601 string with microseconds.
pub fn now_iso() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Whether answers are scored directly or after a verifier pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvalMode {
    #[default]
    SinglePass,
    Verified,
}

impl EvalMode {
    /// Default results filename for this mode.
    pub fn default_results_file(self) -> &'static str {
        match self {
            EvalMode::SinglePass => "model_accuracy_results.json",
            EvalMode::Verified => "model_accuracy_results_verified.json",
        }
    }

    pub fn is_verified(self) -> bool {
        matches!(self, EvalMode::Verified)
    }
}

impl fmt::Display for EvalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalMode::SinglePass => write!(f, "single-pass"),
            EvalMode::Verified => write!(f, "verified"),
        }
    }
}

/// One scored question from a single-pass run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinglePassRecord {
    pub id: u64,
    pub model_answer: Letter,
    pub correct_answer: Letter,
    pub is_correct: bool,
    pub timestamp: String,
}

/// One scored question from a verified run.
///
/// Scored on `verified_answer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedRecord {
    pub id: u64,
    pub original_answer: Letter,
    pub verified_answer: Letter,
    pub was_changed: bool,
    pub correct_answer: Letter,
    pub is_correct: bool,
    pub timestamp: String,
}

/// A processed question in either record shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
    // Tried first: a verified record is a superset of the single-pass fields.
    Verified(VerifiedRecord),
    SinglePass(SinglePassRecord),
}

impl Record {
    /// Score a single-pass answer.
    pub fn single_pass(id: u64, model_answer: Letter, correct_answer: Letter) -> Self {
        Record::SinglePass(SinglePassRecord {
            id,
            model_answer,
            correct_answer,
            is_correct: model_answer == correct_answer,
            timestamp: now_iso(),
        })
    }

    /// Score a verified answer. `was_changed` is derived from the two letters.
    pub fn verified(
        id: u64,
        original_answer: Letter,
        verified_answer: Letter,
        correct_answer: Letter,
    ) -> Self {
        Record::Verified(VerifiedRecord {
            id,
            original_answer,
            verified_answer,
            was_changed: original_answer != verified_answer,
            correct_answer,
            is_correct: verified_answer == correct_answer,
            timestamp: now_iso(),
        })
    }

    pub fn id(&self) -> u64 {
        match self {
            Record::SinglePass(r) => r.id,
            Record::Verified(r) => r.id,
        }
    }

    /// The run mode that produces this kind of record.
    pub fn mode(&self) -> EvalMode {
        match self {
            Record::SinglePass(_) => EvalMode::SinglePass,
            Record::Verified(_) => EvalMode::Verified,
        }
    }

    pub fn is_correct(&self) -> bool {
        match self {
            Record::SinglePass(r) => r.is_correct,
            Record::Verified(r) => r.is_correct,
        }
    }

    /// Always false for single-pass records.
    pub fn was_changed(&self) -> bool {
        match self {
            Record::SinglePass(_) => false,
            Record::Verified(r) => r.was_changed,
        }
    }

    /// The letter the record was scored on.
    pub fn final_answer(&self) -> Letter {
        match self {
            Record::SinglePass(r) => r.model_answer,
            Record::Verified(r) => r.verified_answer,
        }
    }
}

/// Run-level header of a results document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub model: String,
    pub start_time: String,
    pub last_updated: String,
    #[serde(default)]
    pub total_questions: usize,
    #[serde(default)]
    pub questions_processed: usize,
    #[serde(default)]
    pub correct_answers: usize,
    /// Percentage in 0..=100
    #[serde(default)]
    pub accuracy: f64,
    /// Present only for verified runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers_changed_by_verifier: Option<usize>,

    /// Fields written by other tools, kept on rewrite
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Metadata {
    /// A zeroed header for a new run.
    pub fn fresh(model: impl Into<String>, total_questions: usize, mode: EvalMode) -> Self {
        let now = now_iso();
        Self {
            model: model.into(),
            start_time: now.clone(),
            last_updated: now,
            total_questions,
            questions_processed: 0,
            correct_answers: 0,
            accuracy: 0.0,
            answers_changed_by_verifier: mode.is_verified().then_some(0),
            extra: Map::new(),
        }
    }
}

/// Aggregates derived from a record list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregates {
    pub questions_processed: usize,
    pub correct_answers: usize,
    pub accuracy: f64,
    pub answers_changed: usize,
}

/// Derive every aggregate from `records`.
///
/// Accuracy is 0 for an empty list.
pub fn recompute(records: &[Record]) -> Aggregates {
    let questions_processed = records.len();
    let correct_answers = records.iter().filter(|r| r.is_correct()).count();
    let answers_changed = records.iter().filter(|r| r.was_changed()).count();
    let accuracy = if questions_processed == 0 {
        0.0
    } else {
        100.0 * correct_answers as f64 / questions_processed as f64
    };

    Aggregates {
        questions_processed,
        correct_answers,
        accuracy,
        answers_changed,
    }
}

/// The persisted results of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsDocument {
    pub metadata: Metadata,
    #[serde(default)]
    pub processed_questions: Vec<Record>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResultsDocument {
    pub fn new(model: impl Into<String>, total_questions: usize, mode: EvalMode) -> Self {
        Self {
            metadata: Metadata::fresh(model, total_questions, mode),
            processed_questions: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Overwrite the metadata aggregates with values derived from the records.
    ///
    /// The verifier count is written when the run is verified or when any
    /// record is a verified record.
    pub fn refresh_aggregates(&mut self, mode: EvalMode) {
        let aggregates = recompute(&self.processed_questions);
        let has_verified = self
            .processed_questions
            .iter()
            .any(|r| matches!(r, Record::Verified(_)));

        let meta = &mut self.metadata;
        meta.questions_processed = aggregates.questions_processed;
        meta.correct_answers = aggregates.correct_answers;
        meta.accuracy = aggregates.accuracy;
        meta.answers_changed_by_verifier = (mode.is_verified()
            || has_verified
            || meta.answers_changed_by_verifier.is_some())
        .then_some(aggregates.answers_changed);
    }

    /// Check the aggregate invariants against the records.
    pub fn is_consistent(&self) -> bool {
        let aggregates = recompute(&self.processed_questions);
        let meta = &self.metadata;
        meta.questions_processed == aggregates.questions_processed
            && meta.correct_answers == aggregates.correct_answers
            && (meta.accuracy - aggregates.accuracy).abs() < 1e-9
            && meta
                .answers_changed_by_verifier
                .map_or(true, |n| n == aggregates.answers_changed)
    }
}
