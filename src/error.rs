//! Error handling for the ranking engine and its command line driver

use std::io;
use thiserror::Error;

/// Custom error type for ranking operations
#[derive(Error, Debug)]
pub enum RankError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("No such file or directory: {file}")]
    FileNotFound { file: String },

    #[error("Invalid state token: {reason}")]
    InvalidToken { reason: String },

    #[error("Draw {value} at position {position} is outside the pool of {pool} items")]
    InvalidDraw {
        position: usize,
        value: usize,
        pool: usize,
    },

    #[error("No comparison is waiting for an answer")]
    NoPendingComparison,

    #[error("Comparison was cancelled")]
    Cancelled,

    #[error("Comparison event receiver was dropped")]
    EventChannelClosed,

    #[error("Invalid answer: {input}")]
    InvalidAnswer { input: String },

    #[error("Conflicting options: {message}")]
    ConflictingOptions { message: String },

    #[error("Item list is empty")]
    EmptyItemList,

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RankError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            RankError::FileNotFound { .. }
            | RankError::Io(_)
            | RankError::ConflictingOptions { .. }
            | RankError::ParseError { .. } => crate::USAGE_FAILURE,

            _ => crate::EXIT_FAILURE,
        }
    }

    /// Create a file not found error
    pub fn file_not_found(file: &str) -> Self {
        RankError::FileNotFound {
            file: file.to_string(),
        }
    }

    /// Create an invalid token error
    pub fn invalid_token(reason: &str) -> Self {
        RankError::InvalidToken {
            reason: reason.to_string(),
        }
    }

    /// Create an invalid draw error
    pub fn invalid_draw(position: usize, value: usize, pool: usize) -> Self {
        RankError::InvalidDraw {
            position,
            value,
            pool,
        }
    }

    /// Create an invalid answer error
    pub fn invalid_answer(input: &str) -> Self {
        RankError::InvalidAnswer {
            input: input.to_string(),
        }
    }

    /// Create a conflicting options error
    pub fn conflicting_options(message: &str) -> Self {
        RankError::ConflictingOptions {
            message: message.to_string(),
        }
    }

    /// Create a parse error
    pub fn parse_error(message: &str) -> Self {
        RankError::ParseError {
            message: message.to_string(),
        }
    }

    /// Create an internal error
    pub fn internal(message: &str) -> Self {
        RankError::Internal {
            message: message.to_string(),
        }
    }

    /// True for the errors a driver treats as "start over" rather than fatal
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RankError::InvalidToken { .. }
                | RankError::InvalidDraw { .. }
                | RankError::Cancelled
                | RankError::NoPendingComparison
        )
    }
}

/// Result type for ranking operations
pub type RankResult<T> = Result<T, RankError>;

/// Context trait for adding file names to I/O errors
pub trait RankContext<T> {
    fn with_file_context(self, filename: &str) -> RankResult<T>;
}

impl<T> RankContext<T> for Result<T, io::Error> {
    fn with_file_context(self, filename: &str) -> RankResult<T> {
        self.map_err(|io_err| match io_err.kind() {
            io::ErrorKind::NotFound => RankError::file_not_found(filename),
            _ => RankError::Io(io::Error::new(
                io_err.kind(),
                format!("{}: {}", filename, io_err),
            )),
        })
    }
}
