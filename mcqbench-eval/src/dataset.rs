//! Question set loading.
//!
//! The question file is read once at startup. Two layouts are accepted:
//!
//! ```json
//! {"questions": [{"id": 1, "question": "...", "options": {"A": "...", "B": "...", "C": "...", "D": "..."}, "correct_answer": "B"}]}
//! ```
//!
//! or the bare array inside `questions`.

use mcqbench_core::{Question, QuestionError};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Errors that can occur when loading a question set.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DatasetError {
    /// Failed to read the question file
    #[error("Failed to read questions from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the question file
    #[error("Failed to parse questions: {0}")]
    Parse(String),

    /// A question is structurally invalid
    #[error("Invalid question: {0}")]
    Invalid(#[from] QuestionError),

    /// Two questions share an id
    #[error("Duplicate question id {0}")]
    DuplicateId(u64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuestionFile {
    Wrapped { questions: Vec<Question> },
    Bare(Vec<Question>),
}

/// An ordered, validated set of questions.
#[derive(Debug, Clone)]
pub struct QuestionSet {
    name: String,
    questions: Vec<Question>,
}

impl QuestionSet {
    /// Build a set from questions already in memory.
    ///
    /// Validates every question and rejects duplicate ids. Order is kept.
    pub fn new(name: impl Into<String>, questions: Vec<Question>) -> Result<Self, DatasetError> {
        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            question.validate()?;
            if !seen.insert(question.id) {
                return Err(DatasetError::DuplicateId(question.id));
            }
        }

        Ok(Self {
            name: name.into(),
            questions,
        })
    }

    /// Load a question file.
    ///
    /// The set is named after the file stem.
    pub async fn load(path: &Path) -> Result<Self, DatasetError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| DatasetError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("questions")
            .to_string();

        Self::from_json(name, &content)
    }

    /// Parse a question set from JSON text.
    pub fn from_json(name: impl Into<String>, content: &str) -> Result<Self, DatasetError> {
        let file: QuestionFile =
            serde_json::from_str(content).map_err(|e| DatasetError::Parse(e.to_string()))?;

        let questions = match file {
            QuestionFile::Wrapped { questions } => questions,
            QuestionFile::Bare(questions) => questions,
        };

        Self::new(name, questions)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Questions in file order.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Question> {
        self.questions.iter()
    }
}

impl<'a> IntoIterator for &'a QuestionSet {
    type Item = &'a Question;
    type IntoIter = std::slice::Iter<'a, Question>;

    fn into_iter(self) -> Self::IntoIter {
        self.questions.iter()
    }
}
