//! # csvtape
//!
//! Streaming parser for delimited text with a header line.
//!
//! The input is read through one fixed-size chunk buffer. Header names are
//! interned in a Robin Hood hash table ([`HashRing`]) that hands out dense ids
//! in first-seen order. Data records are not copied while they are scanned:
//! the tokenizer logs field boundaries onto a [`Tape`], and each finished
//! record is materialized from it before the buffer is refilled.
//!
//! ## Quick Start
//!
//! ```
//! use csvtape::{ParseOptions, TapeReader};
//!
//! let input = "id,name\n1,\"Smith, J.\"\n2,Doe\n";
//! let options = ParseOptions::new().buffer_size(16);
//! let mut reader = TapeReader::with_options(input.as_bytes(), options)?;
//!
//! let header = reader.headers().clone();
//! while let Some(record) = reader.read_record()? {
//!     let name = record.get_by_name(&header, b"name").unwrap_or_default();
//!     println!("{} -> {}", record.index, String::from_utf8_lossy(name));
//! }
//! # Ok::<(), csvtape::TapeError>(())
//! ```

pub mod chunk_reader;
pub mod csv;
pub mod error;
pub mod hash_ring;
pub mod options;
pub mod tape;
pub mod tape_reader;
pub mod types;

pub use chunk_reader::{ChunkReader, Refill};
pub use error::{Malformed, Result, TapeError};
pub use hash_ring::{HashRing, InternId};
pub use options::ParseOptions;
pub use tape::Tape;
pub use tape_reader::{convert, TapeReader};
pub use types::{Field, Header, Record};
