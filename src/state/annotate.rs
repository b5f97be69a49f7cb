//! Mention and tag extraction for posted text.
//!
//! A token is a sigil (`@` or `#`) followed by one or more word characters
//! (`[A-Za-z0-9_]`). The sigil must open the text or follow a non-word
//! character, so `taeber@email.com` carries no mention.

/// Extract `@mentions` in order of appearance, original case, duplicates kept.
pub fn mentions(text: &str) -> Vec<String> {
    scan(text, b'@').map(str::to_string).collect()
}

/// Extract `#tags` in order of appearance, lower-cased, duplicates kept.
pub fn tags(text: &str) -> Vec<String> {
    scan(text, b'#').map(str::to_ascii_lowercase).collect()
}

#[inline]
fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Iterate the word runs that follow `sigil` at a token boundary.
fn scan(text: &str, sigil: u8) -> impl Iterator<Item = &str> {
    let bytes = text.as_bytes();
    let mut pos = 0;

    std::iter::from_fn(move || {
        while pos < bytes.len() {
            let at = pos;
            pos += 1;

            if bytes[at] != sigil || (at > 0 && is_word(bytes[at - 1])) {
                continue;
            }

            let start = at + 1;
            let end = bytes[start..]
                .iter()
                .position(|&b| !is_word(b))
                .map_or(bytes.len(), |n| start + n);

            if end > start {
                pos = end;
                // Word bytes are ASCII, so both ends sit on char boundaries.
                return Some(&text[start..end]);
            }
        }
        None
    })
}
