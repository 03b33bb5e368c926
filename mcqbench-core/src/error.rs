use thiserror::Error;

/// Errors that can occur while talking to the remote chat model
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LlmError {
    /// Transport-level failure from the HTTP client
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("Provider error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Request timed out
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// No content in response
    #[error("No content in response")]
    NoContent,

    /// Response body could not be decoded
    #[error("Failed to process response: {0}")]
    ResponseProcessing(String),

    /// Other LLM error
    #[error("{0}")]
    Other(String),
}

impl LlmError {
    /// Build an error from a non-success HTTP status and its body.
    ///
    /// 429 maps to [`LlmError::RateLimit`]; everything else is [`LlmError::Api`].
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == 429 {
            LlmError::RateLimit(message)
        } else {
            LlmError::Api { status, message }
        }
    }

    /// Check if this is a rate limit error.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimit(_))
    }
}

/// Errors from acquiring a single answer letter for a question
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnswerError {
    /// The model could not be reached or refused the request
    #[error("Transport error: {0}")]
    Transport(#[from] LlmError),

    /// The response contained no recognizable A-D answer
    #[error("Invalid answer format: no single A-D answer in response ({excerpt:?})")]
    InvalidAnswerFormat {
        /// Tail of the offending response, for diagnostics
        excerpt: String,
    },

    /// All attempts failed; carries the cause of the final attempt
    #[error("Gave up after {attempts} attempts: {last}")]
    MaxRetriesExceeded {
        attempts: u32,
        last: Box<AnswerError>,
    },
}

impl AnswerError {
    /// Short, stable label for console and log output.
    pub fn kind(&self) -> &'static str {
        match self {
            AnswerError::Transport(_) => "TransportError",
            AnswerError::InvalidAnswerFormat { .. } => "InvalidAnswerFormat",
            AnswerError::MaxRetriesExceeded { .. } => "MaxRetriesExceeded",
        }
    }

    /// The error that ended the last attempt.
    ///
    /// Unwraps [`AnswerError::MaxRetriesExceeded`]; other variants return themselves.
    pub fn root_cause(&self) -> &AnswerError {
        match self {
            AnswerError::MaxRetriesExceeded { last, .. } => last.root_cause(),
            other => other,
        }
    }
}

/// Errors in question data
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    /// Not one of A, B, C, D
    #[error("Invalid answer letter: {0:?}")]
    InvalidLetter(String),

    /// A question lacks the text for one of its options
    #[error("Question {id} is missing option {letter}")]
    MissingOption { id: u64, letter: char },
}
