//! In-memory record store
//!
//! Records are keyed by citekey and iterate in ascending citekey order. The
//! store is owned by one workflow at a time and is not shared or global; all
//! mutation goes through `&mut self`.

mod dedup;
mod normalization;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CiteError, Result};
use crate::record::CitationRecord;

pub use dedup::{DedupReport, DedupStrategy, DuplicateGroup, IdentityKey, MergeAnomaly};
pub use normalization::normalize_title;

/// Keyed collection of citation records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStore {
    records: BTreeMap<String, CitationRecord>,
}

/// Counts over the verification state of a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    /// Records verified at least once, whatever the outcome
    pub verified: usize,
    /// Records whose ADS link last answered 2xx
    pub ads_reachable: usize,
    /// Records whose DOI link last answered 2xx
    pub doi_reachable: usize,
    pub percentage_verified: f64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a record by citekey. Returns the replaced record.
    pub fn insert(&mut self, record: CitationRecord) -> Result<Option<CitationRecord>> {
        record.validate()?;
        let previous = self.records.insert(record.citekey.clone(), record);
        match &previous {
            Some(old) => tracing::debug!(citekey = %old.citekey, "Replaced citation"),
            None => tracing::debug!(count = self.records.len(), "Inserted citation"),
        }
        Ok(previous)
    }

    pub fn get(&self, citekey: &str) -> Result<&CitationRecord> {
        self.records
            .get(citekey)
            .ok_or_else(|| CiteError::NotFound(citekey.to_string()))
    }

    pub fn get_mut(&mut self, citekey: &str) -> Result<&mut CitationRecord> {
        self.records
            .get_mut(citekey)
            .ok_or_else(|| CiteError::NotFound(citekey.to_string()))
    }

    pub fn remove(&mut self, citekey: &str) -> Result<CitationRecord> {
        let removed = self
            .records
            .remove(citekey)
            .ok_or_else(|| CiteError::NotFound(citekey.to_string()))?;
        tracing::debug!(citekey, "Removed citation");
        Ok(removed)
    }

    /// All records in ascending citekey order
    pub fn all(&self) -> Vec<&CitationRecord> {
        self.records.values().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CitationRecord> {
        self.records.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn contains(&self, citekey: &str) -> bool {
        self.records.contains_key(citekey)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn verification_summary(&self) -> VerificationSummary {
        let is_ok = |status: Option<u16>| status.is_some_and(|s| (200..300).contains(&s));
        let total = self.records.len();
        let verified = self.iter().filter(|r| r.is_verified()).count();
        VerificationSummary {
            total,
            verified,
            ads_reachable: self.iter().filter(|r| is_ok(r.http_status_ads)).count(),
            doi_reachable: self.iter().filter(|r| is_ok(r.http_status_doi)).count(),
            percentage_verified: if total > 0 {
                verified as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        }
    }
}

impl FromIterator<CitationRecord> for RecordStore {
    /// Collect already-validated records; later duplicates of a key win
    fn from_iter<I: IntoIterator<Item = CitationRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().map(|r| (r.citekey.clone(), r)).collect(),
        }
    }
}
