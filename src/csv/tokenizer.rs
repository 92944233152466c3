//! Byte-level state machine for quoted fields and line endings
//!
//! The tokenizer never copies field bytes. It reports `[start, end)` offsets
//! into the window it is scanning to a [`FieldSink`], with the outer quotes of
//! a quoted field already trimmed. Doubled quotes inside a field are left as
//! they are; see [`unescape`](super::unescape).

use crate::error::Malformed;
use crate::tape::Tape;

/// Scanner state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unquoted,
    Quoted,
    /// A `\r` was seen outside quotes
    CarriageReturn,
}

/// Why [`Tokenizer::scan`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// A record ended; scanning can resume in the same window
    Record,
    /// The window is used up
    Exhausted,
}

/// Receives field boundaries from a [`Tokenizer`]
pub trait FieldSink {
    /// A field `window[start..end]` in 1-based `column` was closed
    fn field(&mut self, column: usize, window: &[u8], start: usize, end: usize);

    /// The current record ended
    fn end_record(&mut self);

    /// `window` is about to be replaced; offsets into it stop being valid
    fn before_refill(&mut self, _window: &[u8]) {}
}

impl FieldSink for Tape {
    fn field(&mut self, column: usize, _window: &[u8], start: usize, end: usize) {
        self.append(column, start, end);
    }

    fn end_record(&mut self) {
        self.append_emit();
    }

    fn before_refill(&mut self, window: &[u8]) {
        self.spill(window);
    }
}

/// Resumable tokenizer over a sequence of buffer windows
///
/// # Examples
///
/// ```
/// use csvtape::csv::{Scan, Tokenizer};
/// use csvtape::Tape;
///
/// let window = b"a,\"b,c\",d\n";
/// let mut tokenizer = Tokenizer::new(b',', b'"');
/// let mut tape = Tape::default();
/// assert_eq!(tokenizer.scan(window, &mut tape), Scan::Record);
///
/// let record = tape.records(window).next().unwrap();
/// let fields: Vec<_> = record.fields().map(|(_, bytes)| bytes).collect();
/// assert_eq!(fields, vec![&b"a"[..], &b"b,c"[..], &b"d"[..]]);
/// ```
#[derive(Debug, Clone)]
pub struct Tokenizer {
    delimiter: u8,
    quote: u8,
    state: State,
    /// Offset of the first byte of the open field
    start: usize,
    /// Offset of the next byte to scan
    cursor: usize,
    /// 1-based column of the open field
    column: usize,
}

impl Tokenizer {
    /// Create a tokenizer with custom delimiter and quote bytes
    pub fn new(delimiter: u8, quote: u8) -> Self {
        Tokenizer {
            delimiter,
            quote,
            state: State::Unquoted,
            start: 0,
            cursor: 0,
            column: 1,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Offset of the first unconsumed byte; everything before it is final
    pub fn start(&self) -> usize {
        self.start
    }

    /// Offset of the next byte to scan
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether a record has been started but not ended
    pub fn in_record(&self) -> bool {
        self.column > 1 || self.cursor > self.start
    }

    /// Scan `window` from the cursor until a record ends or bytes run out
    pub fn scan<S: FieldSink>(&mut self, window: &[u8], sink: &mut S) -> Scan {
        while self.cursor < window.len() {
            let i = self.cursor;
            let c = window[i];
            self.cursor += 1;

            match self.state {
                State::Unquoted => {
                    if self.unquoted(c, i, window, sink) {
                        return Scan::Record;
                    }
                }
                State::CarriageReturn => {
                    if c == b'\n' {
                        self.state = State::Unquoted;
                        self.close(window, i - 1, sink);
                        self.end_record(i + 1, sink);
                        return Scan::Record;
                    }
                    // A lone \r is content; the byte after it is scanned as usual.
                    self.state = State::Unquoted;
                    if self.unquoted(c, i, window, sink) {
                        return Scan::Record;
                    }
                }
                State::Quoted => {
                    if c == self.quote {
                        self.state = State::Unquoted;
                    }
                }
            }
        }
        Scan::Exhausted
    }

    /// Realign after a refill moved the unconsumed bytes to the window front
    ///
    /// The open field is scanned again from its first byte. A field always
    /// starts in `Unquoted` state, so the rescan reproduces the same result.
    pub fn rebase(&mut self) {
        self.state = State::Unquoted;
        self.start = 0;
        self.cursor = 0;
    }

    /// Close a record left open at end of stream
    ///
    /// Returns `Ok(true)` if a record was closed, `Ok(false)` if nothing was
    /// pending. An open quote cannot be closed.
    pub fn finish<S: FieldSink>(
        &mut self,
        window: &[u8],
        sink: &mut S,
    ) -> std::result::Result<bool, Malformed> {
        match self.state {
            State::Quoted => Err(Malformed::UnterminatedQuote),
            _ if !self.in_record() => Ok(false),
            state => {
                let end = if state == State::CarriageReturn {
                    self.cursor - 1
                } else {
                    self.cursor
                };
                self.state = State::Unquoted;
                self.close(window, end, sink);
                self.end_record(self.cursor, sink);
                Ok(true)
            }
        }
    }

    /// Returns `true` when `c` ended a record
    fn unquoted<S: FieldSink>(&mut self, c: u8, i: usize, window: &[u8], sink: &mut S) -> bool {
        if c == self.quote {
            self.state = State::Quoted;
        } else if c == self.delimiter {
            self.close(window, i, sink);
            self.start = i + 1;
            self.column += 1;
        } else if c == b'\r' {
            self.state = State::CarriageReturn;
        } else if c == b'\n' {
            self.close(window, i, sink);
            self.end_record(i + 1, sink);
            return true;
        }
        false
    }

    fn close<S: FieldSink>(&self, window: &[u8], end: usize, sink: &mut S) {
        let (start, end) = trim_quotes(window, self.start, end, self.quote);
        sink.field(self.column, window, start, end);
    }

    /// `next` is the offset where the following record starts
    fn end_record<S: FieldSink>(&mut self, next: usize, sink: &mut S) {
        sink.end_record();
        self.start = next;
        self.column = 1;
    }
}

/// Strip the outer quotes of `window[start..end]`
fn trim_quotes(window: &[u8], start: usize, end: usize, quote: u8) -> (usize, usize) {
    if end > start && window[start] == quote {
        let end = if end - start >= 2 && window[end - 1] == quote {
            end - 1
        } else {
            end
        };
        (start + 1, end)
    } else {
        (start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Collects records of `(column, bytes)` eagerly
    #[derive(Default)]
    struct Collect {
        records: Vec<Vec<(usize, String)>>,
        open: Vec<(usize, String)>,
    }

    impl FieldSink for Collect {
        fn field(&mut self, column: usize, window: &[u8], start: usize, end: usize) {
            let text = String::from_utf8_lossy(&window[start..end]).to_string();
            self.open.push((column, text));
        }

        fn end_record(&mut self) {
            self.records.push(std::mem::take(&mut self.open));
        }
    }

    fn tokenize(input: &[u8]) -> Vec<Vec<String>> {
        let mut tokenizer = Tokenizer::new(b',', b'"');
        let mut sink = Collect::default();
        while tokenizer.scan(input, &mut sink) == Scan::Record {}
        sink.records
            .into_iter()
            .map(|r| r.into_iter().map(|(_, s)| s).collect())
            .collect()
    }

    #[test]
    fn test_simple() {
        assert_eq!(tokenize(b"a,b,c\n"), vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_quoted() {
        assert_eq!(tokenize(b"a,\"b,c\",d\n"), vec![vec!["a", "b,c", "d"]]);
    }

    #[test]
    fn test_escaped_quotes_left_doubled() {
        assert_eq!(
            tokenize(b"\"Say \"\"Hello\"\"\",world\n"),
            vec![vec!["Say \"\"Hello\"\"", "world"]]
        );
    }

    #[test]
    fn test_empty_fields() {
        assert_eq!(tokenize(b"a,,c\n"), vec![vec!["a", "", "c"]]);
        assert_eq!(tokenize(b",,\n"), vec![vec!["", "", ""]]);
        assert_eq!(tokenize(b"\"\",\"\"\n"), vec![vec!["", ""]]);
    }

    #[test]
    fn test_quoted_with_newline() {
        assert_eq!(
            tokenize(b"\"Line 1\r\nLine 2\",normal\r\n"),
            vec![vec!["Line 1\r\nLine 2", "normal"]]
        );
    }

    #[test]
    fn test_crlf_matches_lf() {
        let lf = tokenize(b"id,name\n1,\"Smith, J.\"\n2,Doe\n");
        let crlf = tokenize(b"id,name\r\n1,\"Smith, J.\"\r\n2,Doe\r\n");
        assert_eq!(lf, crlf);
        assert_eq!(lf[1], vec!["1", "Smith, J."]);
    }

    #[test]
    fn test_quoted_field_before_crlf() {
        assert_eq!(tokenize(b"a,\"b\"\r\n"), vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_lone_carriage_return_is_content() {
        assert_eq!(tokenize(b"a\rb,c\n"), vec![vec!["a\rb", "c"]]);
        // The byte after a lone \r is still a delimiter.
        assert_eq!(tokenize(b"a\r,c\n"), vec![vec!["a\r", "c"]]);
    }

    #[test]
    fn test_columns_reset_per_record() {
        let mut tokenizer = Tokenizer::new(b',', b'"');
        let mut sink = Collect::default();
        let input = b"x,y\nz\n";
        while tokenizer.scan(input, &mut sink) == Scan::Record {}
        let columns: Vec<Vec<usize>> = sink
            .records
            .iter()
            .map(|r| r.iter().map(|(c, _)| *c).collect())
            .collect();
        assert_eq!(columns, vec![vec![1, 2], vec![1]]);
    }

    #[test]
    fn test_custom_delimiter() {
        let mut tokenizer = Tokenizer::new(b';', b'"');
        let mut sink = Collect::default();
        tokenizer.scan(b"a;\"b;c\";d\n", &mut sink);
        let fields: Vec<_> = sink.records[0].iter().map(|(_, s)| s.as_str()).collect();
        assert_eq!(fields, vec!["a", "b;c", "d"]);
    }

    #[test]
    fn test_rebase_rescans_open_field() {
        let mut tokenizer = Tokenizer::new(b',', b'"');
        let mut sink = Collect::default();
        assert_eq!(tokenizer.scan(b"ab,\"c,", &mut sink), Scan::Exhausted);
        assert_eq!(tokenizer.start(), 3);
        assert_eq!(tokenizer.state(), State::Quoted);

        // The refill carried `"c,` to the front and appended the rest.
        tokenizer.rebase();
        assert_eq!(tokenizer.scan(b"\"c,d\"\n", &mut sink), Scan::Record);
        assert_eq!(
            sink.records,
            vec![vec![(1, "ab".to_string()), (2, "c,d".to_string())]]
        );
    }

    #[test]
    fn test_finish() {
        let mut tokenizer = Tokenizer::new(b',', b'"');
        let mut sink = Collect::default();
        let window = b"a,b";
        assert_eq!(tokenizer.scan(window, &mut sink), Scan::Exhausted);
        assert!(tokenizer.in_record());
        assert_eq!(tokenizer.finish(window, &mut sink), Ok(true));
        assert_eq!(sink.records[0].len(), 2);
        assert_eq!(tokenizer.finish(window, &mut sink), Ok(false));
    }

    #[test]
    fn test_finish_trailing_carriage_return() {
        let mut tokenizer = Tokenizer::new(b',', b'"');
        let mut sink = Collect::default();
        let window = b"a,\"b\"\r";
        tokenizer.scan(window, &mut sink);
        assert_eq!(tokenizer.finish(window, &mut sink), Ok(true));
        assert_eq!(
            sink.records,
            vec![vec![(1, "a".to_string()), (2, "b".to_string())]]
        );
    }

    #[test]
    fn test_finish_after_trailing_delimiter() {
        let mut tokenizer = Tokenizer::new(b',', b'"');
        let mut sink = Collect::default();
        tokenizer.scan(b"a,", &mut sink);
        // Refill carried nothing and the stream ended.
        tokenizer.rebase();
        assert_eq!(tokenizer.scan(b"", &mut sink), Scan::Exhausted);
        assert!(tokenizer.in_record());
        assert_eq!(tokenizer.finish(b"", &mut sink), Ok(true));
        assert_eq!(
            sink.records,
            vec![vec![(1, "a".to_string()), (2, String::new())]]
        );
    }

    #[test]
    fn test_finish_open_quote() {
        let mut tokenizer = Tokenizer::new(b',', b'"');
        let mut sink = Collect::default();
        let window = b"a,\"b";
        tokenizer.scan(window, &mut sink);
        assert_eq!(
            tokenizer.finish(window, &mut sink),
            Err(Malformed::UnterminatedQuote)
        );
    }

    #[test]
    fn test_stops_after_each_record() {
        let mut tokenizer = Tokenizer::new(b',', b'"');
        let mut sink = Collect::default();
        let window = b"id,\"name\",id\r\n1,2,3\r\n";
        assert_eq!(tokenizer.scan(window, &mut sink), Scan::Record);
        assert_eq!(tokenizer.start(), 14);
        assert_eq!(sink.records.len(), 1);
        assert_eq!(tokenizer.scan(window, &mut sink), Scan::Record);
        assert_eq!(tokenizer.scan(window, &mut sink), Scan::Exhausted);
        assert!(!tokenizer.in_record());
        assert_eq!(sink.records[1].len(), 3);
    }

    #[test]
    fn test_tape_sink() {
        let mut tokenizer = Tokenizer::new(b',', b'"');
        let mut tape = Tape::default();
        let window = b"1,\"x\"\n";
        tokenizer.scan(window, &mut tape);
        assert_eq!(tape.emitted(), 1);
        let fields: Vec<_> = tape.records(window).next().unwrap().fields().collect();
        assert_eq!(fields, vec![(1, &b"1"[..]), (2, &b"x"[..])]);
    }
}
