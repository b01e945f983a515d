//! Text utilities

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove diacritics by NFKD decomposition followed by dropping combining marks.
///
/// "Zürich" becomes "Zurich", "ﬁ" becomes "fi".
pub fn remove_diacritics(text: &str) -> String {
    text.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Lower-cased first character of a token.
///
/// Characters whose lowercase form expands to several characters keep only the
/// first one. Returns `None` for an empty token.
pub fn first_char_lowercase(token: &str) -> Option<char> {
    token
        .chars()
        .next()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
}

/// Number of characters (not bytes) in text
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
