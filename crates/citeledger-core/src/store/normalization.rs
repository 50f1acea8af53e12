//! Title normalization for duplicate detection
//!
//! The only fuzzy step in deduplication. No string-distance matching is done.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize a title for identity comparison
///
/// - Unicode compatibility decomposition, diacritics removed
/// - Case-folded
/// - Punctuation and LaTeX markup characters stripped
/// - Whitespace collapsed and trimmed
pub fn normalize_title(title: &str) -> String {
    let stripped: String = title
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c)
            } else if c.is_whitespace() {
                Some(' ')
            } else {
                None
            }
        })
        .flat_map(char::to_lowercase)
        .collect();

    collapse_whitespace(&stripped)
}

/// Collapse runs of whitespace into single spaces and trim the ends
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
