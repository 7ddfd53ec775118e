//! Character-offset helpers
//!
//! Carets are measured in Unicode scalar values, never bytes.

/// Number of characters in `text`
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the character at `offset`, clamped to the end of `text`
pub fn byte_index(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}

/// Split `text` at a character offset into owned head and tail
pub fn split_at_char(text: &str, offset: usize) -> (String, String) {
    let (head, tail) = text.split_at(byte_index(text, offset));
    (head.to_string(), tail.to_string())
}
