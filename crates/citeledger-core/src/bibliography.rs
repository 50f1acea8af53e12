//! Bibliography codec: records as BibTeX
//!
//! Output is meant to go straight into a LaTeX build. Free text is escaped,
//! identifiers and URLs are written verbatim, and fields always appear in the
//! same order. Decoding is best effort: entries that cannot become a valid
//! record are skipped and reported as diagnostics, and fields that cannot be
//! read confidently are left unset.

use std::path::Path;

use citeledger_bibtex::{
    escape_text, format_entries, join_authors, parse, split_authors, unescape_text, BibTeXEntry,
    BibTeXEntryType,
};

use crate::config::BibliographyConfig;
use crate::error::Result;
use crate::identifiers::{self, bibcode_from_ads_url, clean_doi, populated};
use crate::record::CitationRecord;
use crate::store::RecordStore;

/// An entry that could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibliographyDiagnostic {
    pub citekey: Option<String>,
    /// 1-based line where the entry starts, when known
    pub line: Option<u32>,
    pub message: String,
}

/// Records recovered from a bibliography, plus what was skipped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BibliographyDecode {
    pub records: Vec<CitationRecord>,
    pub diagnostics: Vec<BibliographyDiagnostic>,
}

impl BibliographyDecode {
    /// Collect the recovered records; a repeated citekey keeps the later entry
    pub fn into_store(self) -> RecordStore {
        self.records.into_iter().collect()
    }
}

#[derive(Debug, Clone)]
pub struct BibliographyCodec {
    entry_type: BibTeXEntryType,
    misc_without_journal: bool,
}

impl Default for BibliographyCodec {
    fn default() -> Self {
        Self::from_config(&BibliographyConfig::default())
    }
}

impl BibliographyCodec {
    pub fn from_config(config: &BibliographyConfig) -> Self {
        Self {
            entry_type: BibTeXEntryType::from_str(&config.default_entry_type),
            misc_without_journal: config.misc_without_journal,
        }
    }

    /// One entry per record, in citekey order
    pub fn encode(&self, store: &RecordStore) -> String {
        let entries: Vec<BibTeXEntry> = store.iter().map(|r| self.to_entry(r)).collect();
        format_entries(&entries)
    }

    pub fn to_entry(&self, record: &CitationRecord) -> BibTeXEntry {
        let journal = populated(&record.journal);
        let entry_type = if journal.is_none() && self.misc_without_journal {
            BibTeXEntryType::Misc
        } else {
            self.entry_type
        };

        let mut entry = BibTeXEntry::new(record.citekey.clone(), entry_type);
        entry.add_field("title", escape_text(record.title.trim()));
        entry.add_field("author", join_authors(&record.authors));
        entry.add_field("year", record.year.to_string());
        if let Some(journal) = journal {
            entry.add_field("journal", escape_text(journal));
        }
        if let Some(doi) = populated(&record.doi) {
            entry.add_field("doi", doi);
        }
        if let Some(arxiv_id) = populated(&record.arxiv_id) {
            entry.add_field("eprint", arxiv_id);
            entry.add_field("archiveprefix", "arXiv");
        }
        if let Some(url) = record.effective_ads_url() {
            entry.add_field("adsurl", url);
        }
        if let Some(url) = record.effective_publisher_url() {
            entry.add_field("url", url);
        }
        entry
    }

    /// Parse BibTeX text into records. Never fails; problems become
    /// diagnostics.
    pub fn decode(&self, text: &str) -> BibliographyDecode {
        let parsed = parse(text);
        let mut decoded = BibliographyDecode::default();

        for error in parsed.errors {
            decoded.diagnostics.push(BibliographyDiagnostic {
                citekey: None,
                line: Some(error.line),
                message: error.message,
            });
        }

        for entry in &parsed.entries {
            match record_from_entry(entry) {
                Ok(record) => decoded.records.push(record),
                Err(message) => {
                    tracing::warn!(citekey = %entry.cite_key, line = ?entry.line, %message, "Skipping bibliography entry");
                    decoded.diagnostics.push(BibliographyDiagnostic {
                        citekey: Some(entry.cite_key.clone()),
                        line: entry.line,
                        message,
                    });
                }
            }
        }

        decoded.diagnostics.sort_by_key(|d| d.line);
        tracing::debug!(
            records = decoded.records.len(),
            skipped = decoded.diagnostics.len(),
            "Decoded bibliography"
        );
        decoded
    }
}

/// Field-by-field extraction. Only title, author and year are required.
fn record_from_entry(entry: &BibTeXEntry) -> std::result::Result<CitationRecord, String> {
    let title = entry
        .title()
        .map(|t| unescape_text(t).trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or("missing title")?;
    let authors = entry.author().map(split_authors).unwrap_or_default();
    if authors.is_empty() {
        return Err("missing author".to_string());
    }
    let year_text = entry.year().map(str::trim).ok_or("missing year")?;
    let year: i32 = year_text
        .parse()
        .map_err(|_| format!("year `{}` is not a number", year_text))?;

    let mut record =
        CitationRecord::new(entry.cite_key.clone(), title, authors, year).map_err(|e| e.to_string())?;

    record.journal = text_field(entry, "journal");
    record.arxiv_id = verbatim_field(entry, "eprint")
        .map(|id| id.trim_start_matches("arXiv:").to_string());

    if let Some(raw) = verbatim_field(entry, "doi") {
        record.doi = clean_doi(&raw);
        if record.doi.is_none() {
            tracing::warn!(citekey = %record.citekey, doi = %raw, "Ignoring unreadable DOI");
        }
    }

    let ads_url = verbatim_field(entry, "adsurl");
    record.ads_bibcode = verbatim_field(entry, "bibcode")
        .or_else(|| ads_url.as_deref().and_then(bibcode_from_ads_url));
    // URLs derived from identifiers are not stored
    record.ads_url = ads_url.filter(|url| {
        record.ads_bibcode.as_deref().map(identifiers::ads_abs_url).as_ref() != Some(url)
    });
    record.publisher_url = verbatim_field(entry, "url")
        .filter(|url| record.doi_url().as_ref() != Some(url));

    Ok(record)
}

/// Identifier or URL: trimmed, never unescaped
fn verbatim_field(entry: &BibTeXEntry, key: &str) -> Option<String> {
    entry
        .get_field(key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn text_field(entry: &BibTeXEntry, key: &str) -> Option<String> {
    entry
        .get_field(key)
        .map(|v| unescape_text(v).trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Write the store as a `.bib` file
pub fn write_bibliography(
    codec: &BibliographyCodec,
    store: &RecordStore,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, codec.encode(store))?;
    tracing::info!(path = %path.display(), records = store.len(), "Wrote bibliography");
    Ok(())
}

pub fn read_bibliography(codec: &BibliographyCodec, path: impl AsRef<Path>) -> Result<BibliographyDecode> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let decoded = codec.decode(&text);
    tracing::info!(
        path = %path.display(),
        records = decoded.records.len(),
        diagnostics = decoded.diagnostics.len(),
        "Read bibliography"
    );
    Ok(decoded)
}
