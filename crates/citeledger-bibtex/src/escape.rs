//! LaTeX escaping for free-text field values
//!
//! `escape_text` output contains no bare braces, no bare `~` and no lone
//! backslash, so it can sit inside a braced BibTeX value without unbalancing
//! it. `unescape_text(escape_text(s)) == s` for every `s`.

const WORD_ESCAPES: [(&str, char); 3] = [
    ("textbackslash{}", '\\'),
    ("textasciitilde{}", '~'),
    ("textasciicircum{}", '^'),
];

/// Escape the characters LaTeX treats specially in running text
pub fn escape_text(value: &str) -> String {
    let mut result = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\textbackslash{}"),
            '~' => result.push_str("\\textasciitilde{}"),
            '^' => result.push_str("\\textasciicircum{}"),
            '{' | '}' | '&' | '%' | '$' | '#' | '_' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}

/// Undo `escape_text`, tolerating text written by other tools.
///
/// Bare grouping braces (`{A}` case protection) are dropped and a bare `~`
/// becomes a space. Other LaTeX commands are left as they are.
pub fn unescape_text(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(c) = rest.chars().next() {
        rest = &rest[c.len_utf8()..];
        match c {
            '\\' => {
                if let Some((word, ch)) = WORD_ESCAPES.iter().find(|(w, _)| rest.starts_with(w)) {
                    result.push(*ch);
                    rest = &rest[word.len()..];
                    continue;
                }
                match rest.chars().next() {
                    Some(next @ ('{' | '}' | '&' | '%' | '$' | '#' | '_')) => {
                        result.push(next);
                        rest = &rest[1..];
                    }
                    _ => result.push('\\'),
                }
            }
            '{' | '}' => {}
            '~' => result.push(' '),
            _ => result.push(c),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("A & B", "A \\& B")]
    #[case("10% of $100", "10\\% of \\$100")]
    #[case("{Curly} braces", "\\{Curly\\} braces")]
    #[case("a_b #1", "a\\_b \\#1")]
    #[case("back\\slash", "back\\textbackslash{}slash")]
    #[case("x^2 ~ y", "x\\textasciicircum{}2 \\textasciitilde{} y")]
    fn test_escape(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_text(input), expected);
        assert_eq!(unescape_text(expected), input);
    }

    #[test]
    fn test_unescape_drops_grouping_braces() {
        assert_eq!(unescape_text("{A} {N}ew {Method}"), "A New Method");
        assert_eq!(unescape_text("R.~Brent Tully"), "R. Brent Tully");
    }

    #[test]
    fn test_unescape_keeps_unknown_commands() {
        assert_eq!(unescape_text("\\alpha{} Centauri"), "\\alpha Centauri");
    }

    proptest! {
        #[test]
        fn escape_round_trips(s in "\\PC*") {
            prop_assert_eq!(unescape_text(&escape_text(&s)), s);
        }

        #[test]
        fn escaped_text_has_balanced_braces(s in "\\PC*") {
            let escaped = escape_text(&s);
            let mut depth = 0i32;
            let mut chars = escaped.chars();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => { chars.next(); }
                    '{' => depth += 1,
                    '}' => { depth -= 1; prop_assert!(depth >= 0); }
                    _ => {}
                }
            }
            prop_assert_eq!(depth, 0);
        }
    }
}
