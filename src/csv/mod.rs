//! Delimited-text tokenizing, unescaping and re-encoding

mod encoder;
mod tokenizer;
mod unescape;

pub use encoder::RecordEncoder;
pub use tokenizer::{FieldSink, Scan, State, Tokenizer};
pub use unescape::unescape;
