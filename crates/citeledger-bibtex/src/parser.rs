//! BibTeX parser implementation using nom
//!
//! This parser handles standard BibTeX format including:
//! - @string definitions
//! - @preamble declarations
//! - @comment sections
//! - Braced and quoted field values
//! - String concatenation with #
//! - Nested braces in field values
//!
//! A malformed entry never aborts the parse. It is recorded in
//! `BibTeXParseResult::errors` with its line and the parser resumes at the
//! next `@`.

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::map,
    IResult,
};
use std::collections::HashMap;

use crate::entry::{BibTeXEntry, BibTeXEntryType};

/// Position and description of an entry the parser had to skip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibTeXParseError {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

/// Result of parsing a BibTeX file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BibTeXParseResult {
    pub entries: Vec<BibTeXEntry>,
    pub preambles: Vec<String>,
    pub strings: HashMap<String, String>,
    pub errors: Vec<BibTeXParseError>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid syntax at line {line}: {message}")]
    InvalidSyntax { line: u32, message: String },
    #[error("no entry found")]
    NoEntry,
}

/// Parse a BibTeX string
pub fn parse(input: &str) -> BibTeXParseResult {
    parse_bibtex(input)
}

/// Parse exactly one BibTeX entry
pub fn parse_entry(input: &str) -> Result<BibTeXEntry, ParseError> {
    let result = parse_bibtex(input);
    if let Some(error) = result.errors.into_iter().next() {
        return Err(ParseError::InvalidSyntax {
            line: error.line,
            message: error.message,
        });
    }
    result.entries.into_iter().next().ok_or(ParseError::NoEntry)
}

fn parse_bibtex(input: &str) -> BibTeXParseResult {
    let mut result = BibTeXParseResult::default();
    let mut remaining = input;
    let mut current_line = 1u32;

    while !remaining.is_empty() {
        let (rest, skipped) = skip_whitespace_and_comments(remaining);
        current_line += count_lines(skipped);
        remaining = rest;

        if remaining.is_empty() {
            break;
        }

        if !remaining.starts_with('@') {
            let skip_to = remaining.find('@').unwrap_or(remaining.len());
            current_line += count_lines(&remaining[..skip_to]);
            remaining = &remaining[skip_to..];
            continue;
        }

        match parse_at_entry(remaining, &result.strings) {
            Ok((rest, at_entry)) => {
                match at_entry {
                    AtEntry::Entry(mut entry) => {
                        entry.line = Some(current_line);
                        result.entries.push(entry);
                    }
                    AtEntry::String(key, value) => {
                        result.strings.insert(key.to_lowercase(), value);
                    }
                    AtEntry::Preamble(text) => result.preambles.push(text),
                    AtEntry::Comment => {}
                }
                current_line += count_lines(&remaining[..remaining.len() - rest.len()]);
                remaining = rest;
            }
            Err(_) => {
                result.errors.push(BibTeXParseError {
                    line: current_line,
                    column: 1,
                    message: describe_failure(remaining),
                });
                let skip_to = remaining[1..]
                    .find('@')
                    .map(|pos| pos + 1)
                    .unwrap_or(remaining.len());
                current_line += count_lines(&remaining[..skip_to]);
                remaining = &remaining[skip_to..];
            }
        }
    }

    result
}

fn count_lines(text: &str) -> u32 {
    text.matches('\n').count() as u32
}

/// Name the entry that failed so diagnostics point somewhere useful
fn describe_failure(input: &str) -> String {
    let head: String = input
        .lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(60)
        .collect();
    format!("failed to parse entry starting with `{}`", head.trim())
}

enum AtEntry {
    Entry(BibTeXEntry),
    String(String, String),
    Preamble(String),
    Comment,
}

/// Skip whitespace and `%` line comments
fn skip_whitespace_and_comments(input: &str) -> (&str, &str) {
    let mut pos = 0;
    let bytes = input.as_bytes();

    while pos < bytes.len() {
        if bytes[pos].is_ascii_whitespace() {
            pos += 1;
        } else if bytes[pos] == b'%' {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
        } else {
            break;
        }
    }

    (&input[pos..], &input[..pos])
}

fn parse_at_entry<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, AtEntry> {
    let (rest, _) = char('@')(input)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, entry_type) = take_while1(|c: char| c.is_ascii_alphanumeric())(rest)?;

    match entry_type.to_lowercase().as_str() {
        "string" => {
            let (rest, (key, value)) = parse_string_definition(rest, strings)?;
            Ok((rest, AtEntry::String(key, value)))
        }
        "preamble" => {
            let (rest, text) = parse_preamble(rest, strings)?;
            Ok((rest, AtEntry::Preamble(text)))
        }
        "comment" => {
            let (rest, _) = parse_comment_body(rest)?;
            Ok((rest, AtEntry::Comment))
        }
        _ => {
            let (rest, entry) = parse_entry_body(rest, entry_type, strings)?;
            Ok((rest, AtEntry::Entry(entry)))
        }
    }
}

fn parse_string_definition<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, (String, String)> {
    let (rest, _) = multispace0(input)?;
    let (rest, _) = char('{')(rest)?;
    let (rest, (key, value)) = parse_single_field(rest, strings)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char('}')(rest)?;

    Ok((rest, (key, value)))
}

fn parse_preamble<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, String> {
    let (rest, _) = multispace0(input)?;
    let (rest, _) = char('{')(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, value) = parse_field_value(rest, strings)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char('}')(rest)?;

    Ok((rest, value))
}

/// Skip a @comment body: a braced group, or the rest of the line
fn parse_comment_body(input: &str) -> IResult<&str, ()> {
    let (rest, _) = multispace0(input)?;
    if rest.starts_with('{') {
        let (rest, _) = parse_braced_content(rest)?;
        Ok((rest, ()))
    } else {
        let pos = rest.find('\n').unwrap_or(rest.len());
        Ok((&rest[pos..], ()))
    }
}

/// Characters allowed in an entry's cite key
pub fn is_cite_key_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, ',' | '{' | '}' | '(' | ')' | '"' | '#' | '%' | '\'' | '=')
}

fn parse_entry_body<'a>(
    input: &'a str,
    entry_type: &str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, BibTeXEntry> {
    let (rest, _) = multispace0(input)?;
    let (rest, _) = char('{')(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, cite_key) = take_while1(is_cite_key_char)(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char(',')(rest)?;

    let (rest, fields) = parse_fields(rest, strings)?;

    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char('}')(rest)?;

    let mut entry = BibTeXEntry::new(cite_key, BibTeXEntryType::from_str(entry_type));
    for (key, value) in fields {
        entry.add_field(key, value);
    }

    Ok((rest, entry))
}

fn parse_fields<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, Vec<(String, String)>> {
    let mut fields = Vec::new();
    let mut remaining = input;

    loop {
        let (rest, _) = multispace0(remaining)?;

        if rest.starts_with('}') {
            return Ok((rest, fields));
        }

        match parse_single_field(rest, strings) {
            Ok((rest, field)) => {
                fields.push(field);
                let (rest, _) = multispace0(rest)?;
                remaining = rest.strip_prefix(',').unwrap_or(rest);
            }
            Err(_) => return Ok((remaining, fields)),
        }
    }
}

/// Parse `key = value`; keys are lowercased
fn parse_single_field<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, (String, String)> {
    let (rest, _) = multispace0(input)?;
    let (rest, key) =
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-')(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char('=')(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, value) = parse_field_value(rest, strings)?;

    Ok((rest, (key.to_lowercase(), value)))
}

/// Parse a field value (braced, quoted, number, or string reference)
fn parse_field_value<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, String> {
    let mut result = String::new();
    let mut remaining = input;

    loop {
        let (rest, _) = multispace0(remaining)?;

        let (rest, part) = alt((
            parse_braced_value,
            parse_quoted_value,
            map(take_while1(|c: char| c.is_ascii_digit()), |s: &str| {
                s.to_string()
            }),
            map(
                take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
                |s: &str| {
                    strings
                        .get(&s.to_lowercase())
                        .cloned()
                        .unwrap_or_else(|| s.to_string())
                },
            ),
        ))(rest)?;

        result.push_str(&part);
        remaining = rest;

        let (rest, _) = multispace0(remaining)?;
        if let Some(stripped) = rest.strip_prefix('#') {
            remaining = stripped;
        } else {
            return Ok((rest, result));
        }
    }
}

fn parse_braced_value(input: &str) -> IResult<&str, String> {
    let (rest, content) = parse_braced_content(input)?;
    let inner = &content[1..content.len() - 1];
    Ok((rest, inner.to_string()))
}

/// Match a brace group including nested groups; `\{` and `\}` do not count
fn parse_braced_content(input: &str) -> IResult<&str, &str> {
    if !input.starts_with('{') {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )));
    }

    let mut depth = 0;
    let mut pos = 0;
    let bytes = input.as_bytes();

    while pos < bytes.len() {
        match bytes[pos] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[pos + 1..], &input[..pos + 1]));
                }
            }
            b'\\' => pos += 1,
            _ => {}
        }
        pos += 1;
    }

    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

/// Parse a quoted value "content"; quotes inside braces do not terminate it
fn parse_quoted_value(input: &str) -> IResult<&str, String> {
    if !input.starts_with('"') {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )));
    }

    let mut result = String::new();
    let mut brace_depth = 0i32;
    let mut chars = input.char_indices().skip(1);

    while let Some((pos, c)) = chars.next() {
        match c {
            '"' if brace_depth == 0 => return Ok((&input[pos + 1..], result)),
            '{' => {
                brace_depth += 1;
                result.push(c);
            }
            '}' => {
                brace_depth -= 1;
                result.push(c);
            }
            '\\' => {
                result.push(c);
                if let Some((_, next)) = chars.next() {
                    result.push(next);
                }
            }
            _ => result.push(c),
        }
    }

    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_entry() {
        let input = r#"
@article{Tully1977,
    author = {R. Brent Tully and J. Richard Fisher},
    title = {A New Method of Determining Distances to Galaxies},
    year = {1977},
    journal = {Astronomy and Astrophysics},
}
"#;
        let result = parse(input);
        assert_eq!(result.entries.len(), 1);
        assert!(result.errors.is_empty());

        let entry = &result.entries[0];
        assert_eq!(entry.cite_key, "Tully1977");
        assert_eq!(entry.entry_type, BibTeXEntryType::Article);
        assert_eq!(entry.author(), Some("R. Brent Tully and J. Richard Fisher"));
        assert_eq!(entry.year(), Some("1977"));
        assert_eq!(entry.line, Some(2));
    }

    #[test]
    fn test_parse_bibcode_cite_key() {
        let input = "@ARTICLE{1977A&A....54..661T,\n  year = 1977\n}";
        let entry = parse_entry(input).unwrap();
        assert_eq!(entry.cite_key, "1977A&A....54..661T");
        assert_eq!(entry.year(), Some("1977"));
    }

    #[test]
    fn test_parse_quoted_values_keep_utf8() {
        let input = r#"@article{k, author = "Jöns Müller", title = "Testing \"Quotes\""}"#;
        let entry = parse_entry(input).unwrap();
        assert_eq!(entry.author(), Some("Jöns Müller"));
        assert_eq!(entry.title(), Some("Testing \\\"Quotes\\\""));
    }

    #[test]
    fn test_parse_nested_and_escaped_braces() {
        let input = r#"@article{k, title = {A {B}ook with \{escaped\} braces \& more}}"#;
        let entry = parse_entry(input).unwrap();
        assert_eq!(
            entry.title(),
            Some("A {B}ook with \\{escaped\\} braces \\& more")
        );
    }

    #[test]
    fn test_parse_string_definitions_and_concatenation() {
        let input = r#"
@string{aap = "Astronomy and Astrophysics"}
@article{k,
    journal = AAP # { Letters},
}
"#;
        let result = parse(input);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(
            result.entries[0].get_field("journal"),
            Some("Astronomy and Astrophysics Letters")
        );
    }

    #[test]
    fn test_malformed_entry_is_reported_and_skipped() {
        let input = "@article{good1,\n  title = {One},\n}\n\n@article{broken,\n  title = {unclosed\n\n@misc{good2,\n  title = {Two},\n}\n";
        let result = parse(input);
        let keys: Vec<_> = result.entries.iter().map(|e| e.cite_key.as_str()).collect();
        assert_eq!(keys, vec!["good1", "good2"]);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].line, 5);
        assert!(result.errors[0].message.contains("broken"));
        assert_eq!(result.entries[1].line, Some(8));
    }

    #[test]
    fn test_comments_and_preamble() {
        let input = "% leading comment\n@comment{ignored}\n@preamble{\"\\newcommand{\\x}{y}\"}\n@misc{k, note = {n}}";
        let result = parse(input);
        assert_eq!(result.preambles.len(), 1);
        assert_eq!(result.entries.len(), 1);
    }

    #[test]
    fn test_parse_entry_without_entries() {
        assert_eq!(parse_entry("just text"), Err(ParseError::NoEntry));
    }
}
