//! Author list handling
//!
//! Author order is meaningful and is never changed here.

use crate::escape::{escape_text, unescape_text};

/// Join author names with the BibTeX `and` conjunction, escaping each name.
///
/// A name that itself contains the word "and" is wrapped in a brace group so
/// it stays a single author when re-parsed.
pub fn join_authors<S: AsRef<str>>(authors: &[S]) -> String {
    authors
        .iter()
        .map(|name| {
            let name = name.as_ref().trim();
            let escaped = escape_text(name);
            if name.split_whitespace().any(|w| w.eq_ignore_ascii_case("and")) {
                format!("{{{}}}", escaped)
            } else {
                escaped
            }
        })
        .collect::<Vec<_>>()
        .join(" and ")
}

/// Split a raw (still escaped) author field into unescaped names.
///
/// Only an `and` at brace depth 0 separates authors.
pub fn split_authors(value: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut current = String::new();
    let mut word = String::new();
    let mut depth = 0usize;
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                word.push(c);
                if let Some(next) = chars.next() {
                    word.push(next);
                }
            }
            '{' => {
                depth += 1;
                word.push(c);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                word.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                flush_word(&mut word, &mut current, &mut names);
            }
            _ => word.push(c),
        }
    }
    flush_word(&mut word, &mut current, &mut names);
    push_name(&mut current, &mut names);

    names
}

fn flush_word(word: &mut String, current: &mut String, names: &mut Vec<String>) {
    if word.is_empty() {
        return;
    }
    if word.eq_ignore_ascii_case("and") {
        push_name(current, names);
    } else {
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    word.clear();
}

fn push_name(current: &mut String, names: &mut Vec<String>) {
    let name = unescape_text(current);
    let name = name.trim();
    if !name.is_empty() {
        names.push(name.to_string());
    }
    current.clear();
}
