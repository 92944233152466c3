//! Parse configuration

use crate::error::{Result, TapeError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default chunk buffer capacity in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 65536;
/// Default initial tape capacity in entries
pub const DEFAULT_TAPE_CAPACITY: usize = 4096;
/// Default initial HashRing capacity in slots
pub const DEFAULT_RING_CAPACITY: usize = 256;

/// Options controlling a parse run
///
/// Built with chained setters:
///
/// ```
/// use csvtape::ParseOptions;
///
/// let options = ParseOptions::new()
///     .buffer_size(4096)
///     .delimiter(b';')
///     .strict(false);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParseOptions {
    /// Fixed capacity of the chunk buffer
    pub buffer_size: usize,
    /// Initial number of tape entries
    pub tape_capacity: usize,
    /// Initial number of HashRing slots
    pub ring_capacity: usize,
    /// Field separator byte
    pub delimiter: u8,
    /// Field quote byte
    pub quote: u8,
    /// Reject an unterminated trailing record or header line
    pub strict: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            buffer_size: DEFAULT_BUFFER_SIZE,
            tape_capacity: DEFAULT_TAPE_CAPACITY,
            ring_capacity: DEFAULT_RING_CAPACITY,
            delimiter: b',',
            quote: b'"',
            strict: true,
        }
    }
}

impl ParseOptions {
    /// Create options with the default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chunk buffer capacity
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set the initial tape capacity
    pub fn tape_capacity(mut self, capacity: usize) -> Self {
        self.tape_capacity = capacity;
        self
    }

    /// Set the initial HashRing capacity
    pub fn ring_capacity(mut self, capacity: usize) -> Self {
        self.ring_capacity = capacity;
        self
    }

    /// Set a custom delimiter
    pub fn delimiter(mut self, delim: u8) -> Self {
        self.delimiter = delim;
        self
    }

    /// Set a custom quote byte
    pub fn quote(mut self, quote: u8) -> Self {
        self.quote = quote;
        self
    }

    /// Reject (`true`) or accept (`false`) a final record without a line terminator
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Check that the options describe a usable parser
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(TapeError::Config("buffer_size must be positive".to_string()));
        }
        if self.delimiter == self.quote {
            return Err(TapeError::Config(format!(
                "delimiter and quote must differ (both {:?})",
                self.delimiter as char
            )));
        }
        for (name, byte) in [("delimiter", self.delimiter), ("quote", self.quote)] {
            if byte == b'\r' || byte == b'\n' {
                return Err(TapeError::Config(format!(
                    "{} cannot be a line terminator byte",
                    name
                )));
            }
        }
        Ok(())
    }
}
