//! BibTeX parsing, escaping and formatting
//!
//! This crate knows nothing about citation records or ledgers. It deals only
//! with the text format:
//!
//! - Nom-based tolerant parser that reports bad entries and keeps going
//! - Reversible escaping of LaTeX special characters in free text
//! - Author list joining/splitting on the canonical `and` conjunction
//! - Deterministic formatting of entries

mod authors;
mod entry;
mod escape;
mod formatter;
pub mod parser;

pub use authors::{join_authors, split_authors};
pub use entry::{BibTeXEntry, BibTeXEntryType, BibTeXField};
pub use escape::{escape_text, unescape_text};
pub use formatter::{format_entries, format_entry};
pub use parser::{is_cite_key_char, parse, parse_entry, BibTeXParseError, BibTeXParseResult, ParseError};
