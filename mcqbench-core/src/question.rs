//! Multiple-choice question types.

use crate::error::QuestionError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One of the four answer letters.
///
/// Parsing is case-insensitive; serialization is always uppercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Letter {
    A,
    B,
    C,
    D,
}

impl Letter {
    /// All letters in option order.
    pub const ALL: [Letter; 4] = [Letter::A, Letter::B, Letter::C, Letter::D];

    /// Convert a single character, ignoring case.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Letter::A => 'A',
            Letter::B => 'B',
            Letter::C => 'C',
            Letter::D => 'D',
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Letter {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                Letter::from_char(c).ok_or_else(|| QuestionError::InvalidLetter(s.to_string()))
            }
            _ => Err(QuestionError::InvalidLetter(s.to_string())),
        }
    }
}

impl TryFrom<String> for Letter {
    type Error = QuestionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Letter> for String {
    fn from(letter: Letter) -> Self {
        letter.to_string()
    }
}

/// A multiple-choice question with its answer key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique, stable identifier
    pub id: u64,

    /// The question text
    #[serde(rename = "question")]
    pub text: String,

    /// Option text keyed by letter
    pub options: BTreeMap<Letter, String>,

    /// Ground-truth letter
    pub correct_answer: Letter,
}

impl Question {
    /// Text of one option, or an empty string if absent.
    pub fn option(&self, letter: Letter) -> &str {
        self.options.get(&letter).map(String::as_str).unwrap_or("")
    }

    /// Check that all four options are present.
    pub fn validate(&self) -> Result<(), QuestionError> {
        for letter in Letter::ALL {
            if !self.options.contains_key(&letter) {
                return Err(QuestionError::MissingOption {
                    id: self.id,
                    letter: letter.as_char(),
                });
            }
        }
        Ok(())
    }

    /// Exact-match scoring of a final answer against the key.
    pub fn is_correct(&self, answer: Letter) -> bool {
        answer == self.correct_answer
    }
}
