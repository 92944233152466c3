//! Streaming driver: header line into the intern table, body onto the tape

use crate::chunk_reader::ChunkReader;
use crate::csv::{unescape, FieldSink, RecordEncoder, Scan, State, Tokenizer};
use crate::error::{Malformed, Result, TapeError};
use crate::hash_ring::{HashRing, InternId};
use crate::options::ParseOptions;
use crate::tape::Tape;
use crate::types::{Field, Header, Record};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info, trace, warn};

/// Single-pass reader over delimited text with a header line
///
/// The header line is scanned when the reader is created: its distinct names
/// are interned in first-seen order and available from [`headers`]. Data
/// records are then scanned one at a time onto a [`Tape`] and handed out as
/// owned [`Record`]s, so the tape never outlives the buffer window it points
/// into.
///
/// [`headers`]: TapeReader::headers
///
/// # Examples
///
/// ```
/// use csvtape::TapeReader;
///
/// let input = "id,name\r\n1,\"Smith, J.\"\r\n2,Doe\r\n";
/// let mut reader = TapeReader::from_reader(input.as_bytes()).unwrap();
/// assert_eq!(reader.headers().to_strings(), vec!["id", "name"]);
///
/// for record in reader.records() {
///     let record = record.unwrap();
///     println!("{:?}", record.to_strings());
/// }
/// assert_eq!(reader.record_count(), 2);
/// ```
pub struct TapeReader<R> {
    scanner: Scanner<R>,
    tape: Tape,
    header: Header,
    quote: u8,
    record_count: u64,
    finished: bool,
}

impl TapeReader<File> {
    /// Open a file with default options and read its header line
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, ParseOptions::default())
    }

    /// Open a file with custom options and read its header line
    pub fn open_with<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::with_options(file, options)
    }
}

impl<R: Read> TapeReader<R> {
    /// Wrap a stream with default options and read its header line
    pub fn from_reader(reader: R) -> Result<Self> {
        Self::with_options(reader, ParseOptions::default())
    }

    /// Wrap a stream with custom options and read its header line
    pub fn with_options(reader: R, options: ParseOptions) -> Result<Self> {
        options.validate()?;
        let mut scanner = Scanner {
            chunks: ChunkReader::new(reader, options.buffer_size),
            tokenizer: Tokenizer::new(options.delimiter, options.quote),
            strict: options.strict,
            eof: false,
        };

        if scanner.chunks.refill(0)?.is_exhausted() {
            return Err(TapeError::EmptyInput);
        }

        let mut sink = HeaderSink {
            ring: HashRing::with_capacity(options.ring_capacity),
            columns: Vec::new(),
            quote: options.quote,
        };
        if !scanner.next_record(&mut sink, 0)? {
            // Only reachable when the first chunk held no header bytes at all.
            return Err(TapeError::EmptyInput);
        }
        let header = Header::new(sink.ring, sink.columns);
        debug!(
            columns = header.len(),
            distinct = header.ring().len(),
            "parsed header line"
        );

        Ok(TapeReader {
            scanner,
            tape: Tape::with_capacity(options.tape_capacity),
            header,
            quote: options.quote,
            record_count: 0,
            finished: false,
        })
    }

    /// The parsed header line
    pub fn headers(&self) -> &Header {
        &self.header
    }

    /// Read the next data record
    ///
    /// Returns `Ok(None)` once the stream is exhausted. After an error the
    /// reader is finished and keeps returning `Ok(None)`.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        if self.finished {
            return Ok(None);
        }

        let index = self.record_count + 1;
        match self.scanner.next_record(&mut self.tape, index) {
            Ok(true) => {}
            Ok(false) => {
                self.finished = true;
                return Ok(None);
            }
            Err(e) => {
                self.finished = true;
                return Err(e);
            }
        }

        let window = self.scanner.chunks.window();
        let quote = self.quote;
        let record = self.tape.records(window).next().map(|fields| {
            let fields = fields
                .fields()
                .map(|(column, raw)| Field {
                    column,
                    value: unescape(raw, quote).into_owned(),
                })
                .collect();
            Record::new(index, fields)
        });
        self.tape.clear();

        if let Some(record) = &record {
            self.record_count = index;
            trace!(record = index, fields = record.len(), "record complete");
        }
        Ok(record)
    }

    /// Get iterator over data records
    pub fn records(&mut self) -> RecordIterator<'_, R> {
        RecordIterator { reader: self }
    }

    /// Number of data records read so far
    pub fn record_count(&self) -> u64 {
        self.record_count
    }
}

/// Iterator over data records
pub struct RecordIterator<'a, R> {
    reader: &'a mut TapeReader<R>,
}

impl<R: Read> Iterator for RecordIterator<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_record().transpose()
    }
}

/// Feeds header names into the intern table and remembers each column's id
struct HeaderSink {
    ring: HashRing,
    columns: Vec<InternId>,
    quote: u8,
}

impl FieldSink for HeaderSink {
    fn field(&mut self, _column: usize, window: &[u8], start: usize, end: usize) {
        let name = unescape(&window[start..end], self.quote);
        self.columns.push(self.ring.put(&name));
    }

    fn end_record(&mut self) {}
}

/// Chunk buffer plus tokenizer: the read, scan, refill loop
struct Scanner<R> {
    chunks: ChunkReader<R>,
    tokenizer: Tokenizer,
    strict: bool,
    eof: bool,
}

impl<R: Read> Scanner<R> {
    /// Scan until one record has been handed to `sink`
    ///
    /// Returns `Ok(false)` when the stream ended with no record pending.
    /// `record` numbers the record for error reports, 0 for the header line.
    fn next_record<S: FieldSink>(&mut self, sink: &mut S, record: u64) -> Result<bool> {
        loop {
            if self.tokenizer.scan(self.chunks.window(), sink) == Scan::Record {
                return Ok(true);
            }
            if self.eof {
                return self.finish(sink, record);
            }

            let keep_from = self.tokenizer.start();
            if keep_from == 0 && self.chunks.window().len() == self.chunks.capacity() {
                return Err(TapeError::FieldTooLarge {
                    capacity: self.chunks.capacity(),
                    record,
                });
            }

            sink.before_refill(self.chunks.window());
            let refill = self.chunks.refill(keep_from)?;
            self.tokenizer.rebase();
            // A carried tail with no new bytes is scanned once more, then
            // handled as the end of the stream.
            self.eof = refill.read == 0;
        }
    }

    /// Deal with a record still open when the stream ended
    fn finish<S: FieldSink>(&mut self, sink: &mut S, record: u64) -> Result<bool> {
        if !self.tokenizer.in_record() {
            return Ok(false);
        }

        let reason = if self.tokenizer.state() == State::Quoted {
            Some(Malformed::UnterminatedQuote)
        } else if !self.strict {
            None
        } else if record == 0 {
            Some(Malformed::UnterminatedHeader)
        } else {
            Some(Malformed::UnterminatedRecord)
        };
        if let Some(reason) = reason {
            return Err(TapeError::Malformed { record, reason });
        }

        warn!(record, "accepting final record without line terminator");
        self.tokenizer
            .finish(self.chunks.window(), sink)
            .map_err(|reason| TapeError::Malformed { record, reason })
    }
}

/// Convert a stream: header names one per line, then every record re-encoded
///
/// This is the stand-in output stage used by the `csvtape` binary. Returns
/// the number of data records written.
pub fn convert<R: Read, W: Write>(input: R, output: &mut W, options: ParseOptions) -> Result<u64> {
    let encoder = RecordEncoder::new(options.delimiter, options.quote);
    let mut reader = TapeReader::with_options(input, options)?;

    for name in reader.headers().names() {
        output.write_all(name)?;
        output.write_all(b"\n")?;
    }

    let mut buffer = Vec::with_capacity(4096);
    while let Some(record) = reader.read_record()? {
        buffer.clear();
        let values: Vec<&[u8]> = record.values().collect();
        encoder.encode_record(&values, &mut buffer);
        output.write_all(&buffer)?;
    }
    output.flush()?;

    info!(
        records = reader.record_count(),
        headers = reader.headers().ring().len(),
        "conversion finished"
    );
    Ok(reader.record_count())
}
