//! Collapsing of doubled quotes inside field contents

use std::borrow::Cow;

/// Collapse every doubled `quote` in `raw` into a single one
///
/// The tokenizer only trims the outer quotes of a field; this is the
/// consumer-side step that turns `Say ""Hello""` into `Say "Hello"`.
/// Borrows when there is nothing to collapse.
pub fn unescape(raw: &[u8], quote: u8) -> Cow<'_, [u8]> {
    if !raw.contains(&quote) {
        return Cow::Borrowed(raw);
    }

    let mut field = Vec::with_capacity(raw.len());
    let mut bytes = raw.iter().copied().peekable();
    while let Some(byte) = bytes.next() {
        field.push(byte);
        if byte == quote && bytes.peek() == Some(&quote) {
            bytes.next(); // Skip second quote
        }
    }
    Cow::Owned(field)
}
