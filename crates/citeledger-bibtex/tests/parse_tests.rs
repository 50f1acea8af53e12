//! Parser and formatter integration tests

use citeledger_bibtex::{
    escape_text, format_entries, join_authors, parse, parse_entry, split_authors, unescape_text,
    BibTeXEntry, BibTeXEntryType, ParseError,
};

const ADS_EXPORT: &str = r#"@ARTICLE{1998AJ....116.1009R,
       author = {{Riess}, Adam G. and {Filippenko}, Alexei V. and {Challis}, Peter},
        title = "{Observational Evidence from Supernovae for an Accelerating Universe and a Cosmological Constant}",
      journal = {\aj},
     keywords = {COSMOLOGY: OBSERVATIONS, COSMOLOGY: DISTANCE SCALE, SUPERNOVAE: GENERAL},
         year = 1998,
        month = sep,
       volume = {116},
       number = {3},
        pages = {1009-1038},
          doi = {10.1086/300499},
archivePrefix = {arXiv},
       eprint = {astro-ph/9805201},
       adsurl = {https://ui.adsabs.harvard.edu/abs/1998AJ....116.1009R},
      adsnote = {Provided by the SAO/NASA Astrophysics Data System}
}
"#;

#[test]
fn test_parse_ads_export() {
    let result = parse(ADS_EXPORT);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.entries.len(), 1);

    let entry = &result.entries[0];
    assert_eq!(entry.cite_key, "1998AJ....116.1009R");
    assert_eq!(entry.entry_type, BibTeXEntryType::Article);
    assert_eq!(entry.line, Some(1));
    assert_eq!(entry.year(), Some("1998"));
    assert_eq!(entry.get_field("month"), Some("sep"));
    assert_eq!(entry.get_field("archiveprefix"), Some("arXiv"));
    assert_eq!(entry.get_field("eprint"), Some("astro-ph/9805201"));

    let title = unescape_text(entry.title().unwrap());
    assert!(title.starts_with("Observational Evidence from Supernovae"));

    let authors = split_authors(entry.author().unwrap());
    assert_eq!(
        authors,
        vec!["Riess, Adam G.", "Filippenko, Alexei V.", "Challis, Peter"]
    );
}

#[test]
fn test_string_macros_and_concatenation() {
    let input = r#"
@string{apj = "The Astrophysical Journal"}

@article{macro,
    journal = APJ,
    title = "Part one" # { and part two},
    year = 2001
}
"#;
    let result = parse(input);
    assert!(result.errors.is_empty());
    assert_eq!(
        result.strings.get("apj").map(String::as_str),
        Some("The Astrophysical Journal")
    );

    let entry = &result.entries[0];
    assert_eq!(entry.get_field("journal"), Some("The Astrophysical Journal"));
    assert_eq!(entry.title(), Some("Part one and part two"));
}

#[test]
fn test_recovery_keeps_later_entries() {
    let input = "@article{first, title = {One}, year = 2000}\n\
                 @article{broken title = {Two}\n\
                 @article{third, title = {Three}, year = 2002}\n";
    let result = parse(input);

    let keys: Vec<_> = result.entries.iter().map(|e| e.cite_key.as_str()).collect();
    assert_eq!(keys, vec!["first", "third"]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].line, 2);
    assert_eq!(result.entries[1].line, Some(3));
}

#[test]
fn test_parse_entry_requires_an_entry() {
    assert!(matches!(parse_entry("% only a comment\n"), Err(ParseError::NoEntry)));
    let entry = parse_entry("@misc{k, note = {x}}").unwrap();
    assert_eq!(entry.entry_type, BibTeXEntryType::Misc);
}

#[test]
fn test_formatted_entries_parse_back() {
    let mut first = BibTeXEntry::new("smith2020", BibTeXEntryType::Article);
    first.add_field("title", escape_text("Mass & Light: 50% of {M}_{200}"));
    first.add_field("author", join_authors(&["Smith, J.", "Johnson and Sons"]));
    first.add_field("year", "2020");
    first.add_field("url", "https://example.org/a?b=c&d=%20");

    let mut second = BibTeXEntry::new("thesis", BibTeXEntryType::PhdThesis);
    second.add_field("title", "A Thesis");
    second.add_field("year", "1999");

    let text = format_entries(&[first, second]);
    let result = parse(&text);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.entries.len(), 2);

    let back = &result.entries[0];
    assert_eq!(
        unescape_text(back.title().unwrap()),
        "Mass & Light: 50% of {M}_{200}"
    );
    assert_eq!(
        split_authors(back.author().unwrap()),
        vec!["Smith, J.", "Johnson and Sons"]
    );
    assert_eq!(back.get_field("url"), Some("https://example.org/a?b=c&d=%20"));
    assert_eq!(result.entries[1].entry_type, BibTeXEntryType::PhdThesis);
    assert_eq!(result.entries[1].line, Some(8));
}
