//! Citation record model
//!
//! A `CitationRecord` is one bibliographic entry plus the state of its last
//! link verification. Records are built through `CitationRecord::new`, which
//! rejects malformed input at the boundary; field names match the ledger's
//! JSON keys.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use citeledger_bibtex::is_cite_key_char;
use serde::{Deserialize, Serialize};

use crate::error::{CiteError, Result};
use crate::identifiers::{self, populated};

/// Earliest publication year accepted
pub const MIN_YEAR: i32 = 1900;

/// Latest publication year accepted: next calendar year (in press)
pub fn max_year() -> i32 {
    Utc::now().year() + 1
}

/// Overall result of the most recent verification of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationOutcome {
    /// Every probed link answered 2xx
    Reachable,
    /// At least one link answered with a non-2xx status
    Unreachable,
    /// At least one link produced no HTTP response
    Failed,
    /// A probe or the batch deadline timed out
    Timeout,
    /// Nothing to probe
    Skipped,
}

/// One bibliographic entry with its verification metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationRecord {
    pub citekey: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: i32,
    pub journal: Option<String>,
    pub ads_bibcode: Option<String>,
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    pub ads_url: Option<String>,
    pub publisher_url: Option<String>,

    #[serde(default, with = "timestamp")]
    pub last_verified: Option<DateTime<Utc>>,
    pub http_status_ads: Option<u16>,
    pub http_status_doi: Option<u16>,
    #[serde(default)]
    pub crossref_match: bool,
    #[serde(default)]
    pub ads_match: bool,
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_outcome: Option<VerificationOutcome>,

    /// Ledger keys this version does not know about, kept verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CitationRecord {
    /// Create a validated record from its required fields
    pub fn new(
        citekey: impl Into<String>,
        title: impl Into<String>,
        authors: Vec<String>,
        year: i32,
    ) -> Result<Self> {
        let record = Self {
            citekey: citekey.into(),
            title: title.into(),
            authors,
            year,
            journal: None,
            ads_bibcode: None,
            doi: None,
            arxiv_id: None,
            ads_url: None,
            publisher_url: None,
            last_verified: None,
            http_status_ads: None,
            http_status_doi: None,
            crossref_match: false,
            ads_match: false,
            notes: None,
            verification_outcome: None,
            extra: BTreeMap::new(),
        };
        record.validate()?;
        Ok(record)
    }

    pub fn with_journal(mut self, journal: impl Into<String>) -> Self {
        self.journal = Some(journal.into());
        self
    }

    pub fn with_ads_bibcode(mut self, bibcode: impl Into<String>) -> Self {
        self.ads_bibcode = Some(bibcode.into());
        self
    }

    pub fn with_doi(mut self, doi: impl Into<String>) -> Self {
        self.doi = Some(doi.into());
        self
    }

    pub fn with_arxiv_id(mut self, arxiv_id: impl Into<String>) -> Self {
        self.arxiv_id = Some(arxiv_id.into());
        self
    }

    pub fn with_ads_url(mut self, url: impl Into<String>) -> Self {
        self.ads_url = Some(url.into());
        self
    }

    pub fn with_publisher_url(mut self, url: impl Into<String>) -> Self {
        self.publisher_url = Some(url.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Check required fields and the year range
    pub fn validate(&self) -> Result<()> {
        let key = self.citekey.as_str();
        if key.trim().is_empty() {
            return Err(CiteError::validation(key, "citekey", "citekey is required"));
        }
        if let Some(bad) = key.chars().find(|&c| !is_cite_key_char(c)) {
            return Err(CiteError::validation(
                key,
                "citekey",
                format!("{:?} is not allowed in a BibTeX cite key", bad),
            ));
        }
        if self.title.trim().is_empty() {
            return Err(CiteError::validation(key, "title", "title is required"));
        }
        if self.authors.is_empty() {
            return Err(CiteError::validation(key, "authors", "at least one author is required"));
        }
        if let Some(index) = self.authors.iter().position(|a| a.trim().is_empty()) {
            return Err(CiteError::validation(
                key,
                "authors",
                format!("author #{} is blank", index + 1),
            ));
        }
        let max = max_year();
        if !(MIN_YEAR..=max).contains(&self.year) {
            return Err(CiteError::validation(
                key,
                "year",
                format!("{} is outside {}..={}", self.year, MIN_YEAR, max),
            ));
        }
        Ok(())
    }

    /// The ADS abstract page: `ads_url`, or the URL derived from the bibcode
    pub fn effective_ads_url(&self) -> Option<String> {
        populated(&self.ads_url)
            .map(str::to_string)
            .or_else(|| populated(&self.ads_bibcode).map(identifiers::ads_abs_url))
    }

    /// The DOI resolver URL, if a DOI is set
    pub fn doi_url(&self) -> Option<String> {
        populated(&self.doi).map(identifiers::doi_url)
    }

    /// `publisher_url`, or the DOI resolver URL
    pub fn effective_publisher_url(&self) -> Option<String> {
        populated(&self.publisher_url)
            .map(str::to_string)
            .or_else(|| self.doi_url())
    }

    /// Number of populated identifiers among bibcode, DOI and arXiv ID
    pub fn identifier_count(&self) -> usize {
        [&self.ads_bibcode, &self.doi, &self.arxiv_id]
            .into_iter()
            .filter(|v| populated(v).is_some())
            .count()
    }

    /// True once any verification has run, whatever its outcome
    pub fn is_verified(&self) -> bool {
        self.last_verified.is_some()
    }
}

/// RFC 3339 on output. On input, naive ISO-8601 timestamps (no offset) are
/// read as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_some(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => parse(text).map(Some).map_err(D::Error::custom),
        }
    }

    pub(super) fn parse(text: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
            return Ok(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("invalid timestamp `{}`: {}", text, e))
    }
}
