//! BibTeX formatting
//!
//! Values are written as given; escaping free text is the caller's job
//! (see `escape_text`), since identifiers and URLs must stay verbatim.

use crate::entry::BibTeXEntry;

/// Format a single BibTeX entry
pub fn format_entry(entry: &BibTeXEntry) -> String {
    let mut result = String::new();

    result.push('@');
    result.push_str(entry.entry_type.as_str());
    result.push('{');
    result.push_str(&entry.cite_key);
    result.push_str(",\n");

    for field in &entry.fields {
        result.push_str("    ");
        result.push_str(&field.key);
        result.push_str(" = ");
        result.push_str(&format_field_value(&field.value));
        result.push_str(",\n");
    }

    result.push('}');
    result
}

/// Format entries separated by a blank line, with a trailing newline
pub fn format_entries(entries: &[BibTeXEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let mut result = entries
        .iter()
        .map(format_entry)
        .collect::<Vec<_>>()
        .join("\n\n");
    result.push('\n');
    result
}

fn format_field_value(value: &str) -> String {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        return value.to_string();
    }

    let mut result = String::with_capacity(value.len() + 2);
    result.push('{');
    result.push_str(value);
    result.push('}');
    result
}
