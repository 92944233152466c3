//! Deferred field/record boundary log
//!
//! The tokenizer records where fields start and end instead of copying their
//! bytes. A span normally points into the chunk buffer window that was active
//! when it was appended; [`Tape::spill`] copies such spans into tape-owned
//! storage before the window is replaced, so every entry always resolves
//! against either the current window or the tape itself.

use tracing::debug;

/// Growth multiplier for the entry log
const TAPE_GROW_FACTOR: usize = 4;

/// Storage a [`Span`] refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The current chunk buffer window
    Window,
    /// The tape's own spill storage
    Spilled,
}

/// Byte range `[start, end)` of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub origin: Origin,
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One tape record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapeEntry {
    /// A field boundary with its 1-based column index
    Field { column: usize, span: Span },
    /// Zero-width record-end marker
    Emit,
}

/// Append-only log of field boundaries and record-end markers
#[derive(Debug, Clone)]
pub struct Tape {
    entries: Vec<TapeEntry>,
    spill: Vec<u8>,
    emitted: u64,
}

impl Default for Tape {
    fn default() -> Self {
        Self::with_capacity(crate::options::DEFAULT_TAPE_CAPACITY)
    }
}

impl Tape {
    /// Create a tape with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Tape {
            entries: Vec::with_capacity(capacity.max(1)),
            spill: Vec::new(),
            emitted: 0,
        }
    }

    /// Record a field at window offsets `[start, end)`
    pub fn append(&mut self, column: usize, start: usize, end: usize) {
        self.push(TapeEntry::Field {
            column,
            span: Span {
                origin: Origin::Window,
                start,
                end,
            },
        });
    }

    /// Record the end of a record
    pub fn append_emit(&mut self) {
        self.push(TapeEntry::Emit);
        self.emitted += 1;
    }

    fn push(&mut self, entry: TapeEntry) {
        if self.entries.len() == self.entries.capacity() {
            let grow = self.entries.capacity() * (TAPE_GROW_FACTOR - 1);
            self.entries.reserve_exact(grow.max(1));
        }
        self.entries.push(entry);
    }

    /// Number of entries currently held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record-end markers appended over the tape's lifetime
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn entries(&self) -> &[TapeEntry] {
        &self.entries
    }

    /// Copy every window-backed field into tape-owned storage
    ///
    /// Must be called with the current window before that window is
    /// replaced by a refill.
    pub fn spill(&mut self, window: &[u8]) {
        let mut copied = 0;
        for entry in &mut self.entries {
            if let TapeEntry::Field { span, .. } = entry {
                if span.origin == Origin::Window {
                    let start = self.spill.len();
                    self.spill.extend_from_slice(&window[span.start..span.end]);
                    *span = Span {
                        origin: Origin::Spilled,
                        start,
                        end: self.spill.len(),
                    };
                    copied += span.len();
                }
            }
        }
        if copied > 0 {
            debug!(bytes = copied, "spilled pending fields");
        }
    }

    /// Bytes of `span`, resolved against `window` or spill storage
    pub fn resolve<'a>(&'a self, span: &Span, window: &'a [u8]) -> &'a [u8] {
        match span.origin {
            Origin::Window => &window[span.start..span.end],
            Origin::Spilled => &self.spill[span.start..span.end],
        }
    }

    /// Walk the completed (emit-terminated) records on the tape
    pub fn records<'a>(&'a self, window: &'a [u8]) -> Records<'a> {
        Records {
            tape: self,
            window,
            rest: &self.entries,
        }
    }

    /// Drop all entries and spilled bytes; the emit count is kept
    pub fn clear(&mut self) {
        self.entries.clear();
        self.spill.clear();
    }
}

/// Iterator over emit-delimited groups of a [`Tape`]
pub struct Records<'a> {
    tape: &'a Tape,
    window: &'a [u8],
    rest: &'a [TapeEntry],
}

impl<'a> Iterator for Records<'a> {
    type Item = TapeRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let end = self.rest.iter().position(|e| *e == TapeEntry::Emit)?;
        let entries = &self.rest[..end];
        self.rest = &self.rest[end + 1..];
        Some(TapeRecord {
            tape: self.tape,
            window: self.window,
            entries,
        })
    }
}

/// The fields of one completed record on the tape
pub struct TapeRecord<'a> {
    tape: &'a Tape,
    window: &'a [u8],
    entries: &'a [TapeEntry],
}

impl<'a> TapeRecord<'a> {
    /// `(column, bytes)` for every field, in input order
    pub fn fields(&self) -> impl Iterator<Item = (usize, &'a [u8])> + '_ {
        let tape = self.tape;
        let window = self.window;
        self.entries.iter().filter_map(move |entry| match entry {
            TapeEntry::Field { column, span } => Some((*column, tape.resolve(span, window))),
            TapeEntry::Emit => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(tape: &Tape, window: &[u8]) -> Vec<Vec<(usize, Vec<u8>)>> {
        tape.records(window)
            .map(|r| r.fields().map(|(c, b)| (c, b.to_vec())).collect())
            .collect()
    }

    #[test]
    fn test_records_are_emit_delimited() {
        let window = b"1,a\n2,b\n3";
        let mut tape = Tape::with_capacity(2);
        tape.append(1, 0, 1);
        tape.append(2, 2, 3);
        tape.append_emit();
        tape.append(1, 4, 5);
        tape.append(2, 6, 7);
        tape.append_emit();
        tape.append(1, 8, 9);

        let records = collect(&tape, window);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], vec![(1, b"1".to_vec()), (2, b"a".to_vec())]);
        assert_eq!(records[1], vec![(1, b"2".to_vec()), (2, b"b".to_vec())]);
        assert_eq!(tape.emitted(), 2);
        assert_eq!(tape.len(), 7);
    }

    #[test]
    fn test_grows_geometrically() {
        let mut tape = Tape::with_capacity(2);
        let initial = tape.entries.capacity();
        for i in 0..=initial {
            tape.append(1, i, i);
        }
        assert!(tape.entries.capacity() >= initial * TAPE_GROW_FACTOR);
    }

    #[test]
    fn test_spill_survives_window_change() {
        let mut tape = Tape::default();
        tape.append(1, 0, 5);
        tape.spill(b"hello,wor");
        // The window is now something else entirely.
        tape.append(2, 0, 5);
        tape.append_emit();

        let records = collect(&tape, b"world\n");
        assert_eq!(
            records,
            vec![vec![(1, b"hello".to_vec()), (2, b"world".to_vec())]]
        );
    }

    #[test]
    fn test_clear_keeps_emit_count() {
        let mut tape = Tape::default();
        tape.append(1, 0, 0);
        tape.append_emit();
        tape.spill(b"");
        tape.clear();
        assert!(tape.is_empty());
        assert_eq!(tape.emitted(), 1);
        assert_eq!(tape.records(b"").count(), 0);
    }
}
