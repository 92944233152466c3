//! Error types for csvtape

use thiserror::Error;

/// Result type alias for csvtape operations
pub type Result<T> = std::result::Result<T, TapeError>;

/// Errors that can occur while streaming delimited text
#[derive(Error, Debug)]
pub enum TapeError {
    /// Reading from the underlying stream failed
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a header byte was read
    #[error("Input is empty, expected a header record")]
    EmptyInput,

    /// The stream ended in the middle of a record or quoted field
    ///
    /// `record` is the 1-based data record number, 0 for the header line.
    #[error("Malformed input at record {record}: {reason}")]
    Malformed { record: u64, reason: Malformed },

    /// A single field is larger than the chunk buffer
    #[error("Field in record {record} exceeds the {capacity} byte chunk buffer")]
    FieldTooLarge { capacity: usize, record: u64 },

    /// Invalid parse options
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// The kind of truncation found at end of stream
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Malformed {
    #[error("header line has no line terminator")]
    UnterminatedHeader,

    #[error("trailing record has no line terminator")]
    UnterminatedRecord,

    #[error("quoted field is never closed")]
    UnterminatedQuote,
}

impl TapeError {
    /// Returns the malformation kind if this is a malformed-input error
    pub fn malformed(&self) -> Option<Malformed> {
        match self {
            TapeError::Malformed { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}
