//! Re-encoding of parsed records as delimited text

/// Writes records back out with RFC 4180-like quoting
///
/// Used to emit finished records; fields are quoted only when they contain
/// the delimiter, the quote byte or a line break.
pub struct RecordEncoder {
    delimiter: u8,
    quote: u8,
    line_ending: &'static [u8],
}

impl RecordEncoder {
    /// Create an encoder with custom delimiter and quote bytes
    pub fn new(delimiter: u8, quote: u8) -> Self {
        Self {
            delimiter,
            quote,
            line_ending: b"\n",
        }
    }

    /// Terminate records with `\r\n` instead of `\n`
    pub fn crlf(mut self, crlf: bool) -> Self {
        self.line_ending = if crlf { b"\r\n" } else { b"\n" };
        self
    }

    /// Encode a full record, including its line terminator
    pub fn encode_record<F: AsRef<[u8]>>(&self, fields: &[F], buffer: &mut Vec<u8>) {
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                buffer.push(self.delimiter);
            }
            self.encode_field(field.as_ref(), buffer);
        }
        buffer.extend_from_slice(self.line_ending);
    }

    /// Encode single field with proper quoting/escaping
    fn encode_field(&self, field: &[u8], buffer: &mut Vec<u8>) {
        if self.needs_quoting(field) {
            buffer.push(self.quote);
            for &byte in field {
                if byte == self.quote {
                    // Escape quotes by doubling: " -> ""
                    buffer.push(self.quote);
                }
                buffer.push(byte);
            }
            buffer.push(self.quote);
        } else {
            buffer.extend_from_slice(field);
        }
    }

    fn needs_quoting(&self, field: &[u8]) -> bool {
        field
            .iter()
            .any(|&b| b == self.delimiter || b == self.quote || b == b'\n' || b == b'\r')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(fields: &[&str]) -> String {
        let encoder = RecordEncoder::new(b',', b'"');
        let mut buffer = Vec::new();
        encoder.encode_record(fields, &mut buffer);
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_simple_fields() {
        assert_eq!(encode(&["a", "b", "c"]), "a,b,c\n");
    }

    #[test]
    fn test_quoted_fields() {
        assert_eq!(encode(&["a,b", "c"]), "\"a,b\",c\n");
    }

    #[test]
    fn test_escaped_quotes() {
        assert_eq!(
            encode(&[r#"Say "Hello""#, "world"]),
            "\"Say \"\"Hello\"\"\",world\n"
        );
    }

    #[test]
    fn test_newlines() {
        assert_eq!(encode(&["Line 1\nLine 2", "normal"]), "\"Line 1\nLine 2\",normal\n");
    }

    #[test]
    fn test_empty_fields() {
        assert_eq!(encode(&["a", "", "c"]), "a,,c\n");
        assert_eq!(encode(&["", "", ""]), ",,\n");
    }

    #[test]
    fn test_crlf() {
        let encoder = RecordEncoder::new(b';', b'"').crlf(true);
        let mut buffer = Vec::new();
        encoder.encode_record(&[&b"a"[..], &b"b;c"[..]], &mut buffer);
        assert_eq!(buffer, b"a;\"b;c\"\r\n");
    }
}
