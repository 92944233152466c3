//! Fixed-size streaming buffer with boundary carry-over

use std::io::{ErrorKind, Read};
use tracing::debug;

/// Outcome of a [`ChunkReader::refill`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refill {
    /// Unconsumed bytes moved to the buffer front
    pub carried: usize,
    /// Bytes newly read from the stream
    pub read: usize,
}

impl Refill {
    /// Valid bytes now in the buffer
    pub fn available(&self) -> usize {
        self.carried + self.read
    }

    /// Nothing carried and nothing read: the stream is fully consumed
    pub fn is_exhausted(&self) -> bool {
        self.carried == 0 && self.read == 0
    }

    /// The stream ended while unconsumed bytes remain
    ///
    /// The carried bytes lack a terminating delimiter and form a truncated
    /// trailing record.
    pub fn is_truncated(&self) -> bool {
        self.carried > 0 && self.read == 0
    }
}

/// Wraps a byte stream and one fixed-capacity buffer
///
/// The buffer is allocated once and reused for the whole stream. The bytes in
/// `window()` stay valid until the next `refill`.
pub struct ChunkReader<R> {
    reader: R,
    buffer: Box<[u8]>,
    len: usize,
}

impl<R: Read> ChunkReader<R> {
    /// Create a reader with a buffer of `capacity` bytes (at least one)
    pub fn new(reader: R, capacity: usize) -> Self {
        ChunkReader {
            reader,
            buffer: vec![0u8; capacity.max(1)].into_boxed_slice(),
            len: 0,
        }
    }

    /// Fixed buffer capacity
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Valid bytes of the current chunk
    pub fn window(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    /// Load the next chunk, keeping the unconsumed tail `[keep_from, len)`
    ///
    /// The tail is copied to the front of the buffer and the remainder is
    /// filled from the stream until it is full or the stream ends. Pass the
    /// current window length to discard everything.
    ///
    /// # Panics
    /// Panics if `keep_from` is past the end of the current window.
    pub fn refill(&mut self, keep_from: usize) -> std::io::Result<Refill> {
        assert!(
            keep_from <= self.len,
            "refill keeps from {} beyond window of {} bytes",
            keep_from,
            self.len
        );
        let carried = self.len - keep_from;
        if carried > 0 && keep_from > 0 {
            self.buffer.copy_within(keep_from..self.len, 0);
        }
        self.len = carried;

        let read = self.fill()?;
        self.len += read;
        debug!(carried, read, "refilled chunk buffer");
        Ok(Refill { carried, read })
    }

    /// Read until the buffer is full or the stream reports end of input
    fn fill(&mut self) -> std::io::Result<usize> {
        let mut total = 0;
        while self.len + total < self.buffer.len() {
            match self.reader.read(&mut self.buffer[self.len + total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Yields at most `step` bytes per read call
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_plain_reads() {
        let mut chunks = ChunkReader::new(Cursor::new(b"abcdefgh".to_vec()), 5);
        let refill = chunks.refill(0).unwrap();
        assert_eq!(refill, Refill { carried: 0, read: 5 });
        assert_eq!(chunks.window(), b"abcde");

        let refill = chunks.refill(5).unwrap();
        assert_eq!(refill.available(), 3);
        assert_eq!(chunks.window(), b"fgh");

        let refill = chunks.refill(3).unwrap();
        assert!(refill.is_exhausted());
        assert!(chunks.window().is_empty());
    }

    #[test]
    fn test_carry_over() {
        let mut chunks = ChunkReader::new(Cursor::new(b"abcdefgh".to_vec()), 5);
        chunks.refill(0).unwrap();
        // "de" was not consumed yet.
        let refill = chunks.refill(3).unwrap();
        assert_eq!(refill, Refill { carried: 2, read: 3 });
        assert_eq!(chunks.window(), b"defgh");
    }

    #[test]
    fn test_tail_without_new_bytes_is_not_exhaustion() {
        let mut chunks = ChunkReader::new(Cursor::new(b"abc".to_vec()), 8);
        chunks.refill(0).unwrap();
        let refill = chunks.refill(1).unwrap();
        assert_eq!(refill, Refill { carried: 2, read: 0 });
        assert!(!refill.is_exhausted());
        assert!(refill.is_truncated());
        assert_eq!(chunks.window(), b"bc");
    }

    #[test]
    fn test_fills_across_short_reads() {
        let data = b"0123456789";
        let mut chunks = ChunkReader::new(Trickle { data, step: 3 }, 8);
        let refill = chunks.refill(0).unwrap();
        assert_eq!(refill.read, 8);
        assert_eq!(chunks.window(), b"01234567");
    }

    #[test]
    #[should_panic]
    fn test_keep_from_out_of_range() {
        let mut chunks = ChunkReader::new(Cursor::new(b"ab".to_vec()), 4);
        chunks.refill(0).unwrap();
        let _ = chunks.refill(3);
    }
}
