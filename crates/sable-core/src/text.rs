//! Identifier helpers over raw source text.

pub fn is_java_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

pub fn is_java_identifier_part(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// The identifier fragment that ends at `offset`.
///
/// Walks backwards over identifier characters. Offsets past the end are
/// clamped; an offset inside a multi-byte character is moved back to the
/// previous character boundary.
pub fn partial_identifier(text: &str, offset: usize) -> &str {
    let mut end = offset.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let start = text[..end]
        .char_indices()
        .rev()
        .take_while(|(_, ch)| is_java_identifier_part(*ch))
        .last()
        .map_or(end, |(idx, _)| idx);
    &text[start..end]
}
