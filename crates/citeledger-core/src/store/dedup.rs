//! Duplicate detection and merging
//!
//! Two records are duplicates when their normalized titles and years are
//! equal. Detection groups records by that identity key in a single pass, so
//! it scales linearly with the store.

use std::cmp::{Ordering, Reverse};
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::normalization::normalize_title;
use super::RecordStore;
use crate::identifiers::populated;
use crate::record::CitationRecord;

/// Policy for choosing which record of a duplicate group survives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupStrategy {
    /// Most populated identifiers, ranked bibcode > DOI > arXiv ID, then the
    /// earliest citekey
    #[default]
    MostIdentifiers,
    /// Earliest citekey
    EarliestCitekey,
    /// Most recent `last_verified`, then as `MostIdentifiers`
    MostRecentlyVerified,
}

/// Identity used for duplicate detection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub normalized_title: String,
    pub year: i32,
}

impl IdentityKey {
    /// `None` when the title normalizes to nothing (punctuation only), since
    /// such records carry no usable identity
    pub fn of(record: &CitationRecord) -> Option<Self> {
        let normalized_title = normalize_title(&record.title);
        if normalized_title.is_empty() {
            return None;
        }
        Some(Self {
            normalized_title,
            year: record.year,
        })
    }
}

/// Records sharing one identity key; citekeys ascending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub key: IdentityKey,
    pub citekeys: Vec<String>,
}

/// Two populated values that disagreed during a merge. The survivor's value
/// was kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeAnomaly {
    pub survivor: String,
    pub discarded: String,
    pub field: &'static str,
    pub kept: String,
    pub ignored: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupReport {
    /// `(removed citekey, surviving citekey)` pairs
    pub removed: Vec<(String, String)>,
    pub anomalies: Vec<MergeAnomaly>,
}

impl DedupStrategy {
    fn choose<'a>(&self, members: &[&'a CitationRecord]) -> Option<&'a CitationRecord> {
        members.iter().copied().min_by(|a, b| match self {
            DedupStrategy::MostIdentifiers => by_identifiers(a, b),
            DedupStrategy::EarliestCitekey => a.citekey.cmp(&b.citekey),
            DedupStrategy::MostRecentlyVerified => b
                .last_verified
                .cmp(&a.last_verified)
                .then_with(|| by_identifiers(a, b)),
        })
    }
}

/// Richer identifiers first, then earliest citekey
fn by_identifiers(a: &CitationRecord, b: &CitationRecord) -> Ordering {
    let rank = |r: &CitationRecord| {
        Reverse((
            r.identifier_count(),
            populated(&r.ads_bibcode).is_some(),
            populated(&r.doi).is_some(),
            populated(&r.arxiv_id).is_some(),
        ))
    };
    rank(a).cmp(&rank(b)).then_with(|| a.citekey.cmp(&b.citekey))
}

impl RecordStore {
    /// Group records by normalized title and year. Does not mutate the store.
    pub fn find_duplicates(&self) -> Vec<DuplicateGroup> {
        let mut groups: HashMap<IdentityKey, Vec<String>> = HashMap::new();
        // Records iterate in citekey order, so every group comes out sorted
        for record in self.records.values() {
            if let Some(key) = IdentityKey::of(record) {
                groups.entry(key).or_default().push(record.citekey.clone());
            }
        }

        let mut duplicates: Vec<DuplicateGroup> = groups
            .into_iter()
            .filter(|(_, citekeys)| citekeys.len() > 1)
            .map(|(key, citekeys)| DuplicateGroup { key, citekeys })
            .collect();
        duplicates.sort_by(|a, b| a.citekeys[0].cmp(&b.citekeys[0]));
        duplicates
    }

    /// Collapse each duplicate group into one record. Returns how many records
    /// were removed.
    pub fn deduplicate(&mut self, strategy: DedupStrategy) -> usize {
        self.deduplicate_with_report(strategy).removed.len()
    }

    /// Collapse each duplicate group into one record, reporting what was
    /// removed and which conflicting values were ignored.
    pub fn deduplicate_with_report(&mut self, strategy: DedupStrategy) -> DedupReport {
        let mut report = DedupReport::default();

        for group in self.find_duplicates() {
            let members: Vec<&CitationRecord> = group
                .citekeys
                .iter()
                .filter_map(|key| self.records.get(key))
                .collect();
            let Some(survivor_key) = strategy.choose(&members).map(|r| r.citekey.clone()) else {
                continue;
            };
            let Some(mut survivor) = self.records.remove(&survivor_key) else {
                continue;
            };

            for key in group.citekeys.iter().filter(|k| **k != survivor_key) {
                if let Some(discarded) = self.records.remove(key) {
                    merge_into(&mut survivor, &discarded, &mut report.anomalies);
                    report.removed.push((key.clone(), survivor_key.clone()));
                }
            }

            self.records.insert(survivor_key, survivor);
        }

        tracing::info!(
            removed = report.removed.len(),
            anomalies = report.anomalies.len(),
            remaining = self.records.len(),
            "Deduplicated citations"
        );
        report
    }
}

/// Copy what the survivor lacks from a discarded duplicate. Populated values
/// are never overwritten.
fn merge_into(
    survivor: &mut CitationRecord,
    other: &CitationRecord,
    anomalies: &mut Vec<MergeAnomaly>,
) {
    let mut merge = FieldMerge {
        survivor: survivor.citekey.clone(),
        discarded: other.citekey.clone(),
        anomalies,
    };

    merge.text("journal", &mut survivor.journal, &other.journal);
    merge.text("ads_bibcode", &mut survivor.ads_bibcode, &other.ads_bibcode);
    merge.text("doi", &mut survivor.doi, &other.doi);
    merge.text("arxiv_id", &mut survivor.arxiv_id, &other.arxiv_id);

    // An explicit URL only follows its record when it names the survivor's paper
    let ads_linked = same_identifier("ads_bibcode", &survivor.ads_bibcode, &other.ads_bibcode);
    let ads_derived = survivor.effective_ads_url();
    merge.linked_url("ads_url", &mut survivor.ads_url, &other.ads_url, ads_linked, ads_derived);
    let doi_linked = same_identifier("doi", &survivor.doi, &other.doi);
    let doi_derived = survivor.effective_publisher_url();
    merge.linked_url(
        "publisher_url",
        &mut survivor.publisher_url,
        &other.publisher_url,
        doi_linked,
        doi_derived,
    );
    merge.text("notes", &mut survivor.notes, &other.notes);

    // Verification state moves as a block so statuses and timestamp agree
    if survivor.last_verified.is_none() && other.last_verified.is_some() {
        survivor.last_verified = other.last_verified;
        survivor.http_status_ads = other.http_status_ads;
        survivor.http_status_doi = other.http_status_doi;
        survivor.verification_outcome = other.verification_outcome;
    }
    survivor.ads_match |= other.ads_match;
    survivor.crossref_match |= other.crossref_match;

    for (key, value) in &other.extra {
        survivor
            .extra
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
}

struct FieldMerge<'a> {
    survivor: String,
    discarded: String,
    anomalies: &'a mut Vec<MergeAnomaly>,
}

impl FieldMerge<'_> {
    /// Like `text`, but a URL from a record with a different identifier is
    /// never copied into an unset survivor field.
    fn linked_url(
        &mut self,
        field: &'static str,
        kept: &mut Option<String>,
        other: &Option<String>,
        linked: bool,
        derived: Option<String>,
    ) {
        if linked || populated(kept).is_some() {
            return self.text(field, kept, other);
        }
        let Some(incoming) = populated(other) else {
            return;
        };
        if derived.as_deref() == Some(incoming) {
            return;
        }
        self.conflict(field, derived.as_deref().unwrap_or_default(), incoming);
    }

    fn text(&mut self, field: &'static str, kept: &mut Option<String>, other: &Option<String>) {
        let Some(incoming) = populated(other) else {
            return;
        };
        match populated(kept) {
            None => *kept = Some(incoming.to_string()),
            Some(current) if !same_value(field, current, incoming) => {
                self.conflict(field, current, incoming);
            }
            Some(_) => {}
        }
    }

    fn conflict(&mut self, field: &'static str, kept: &str, ignored: &str) {
        tracing::warn!(
            survivor = %self.survivor,
            discarded = %self.discarded,
            field,
            kept,
            ignored,
            "Conflicting values in duplicate citations, keeping survivor's"
        );
        self.anomalies.push(MergeAnomaly {
            survivor: self.survivor.clone(),
            discarded: self.discarded.clone(),
            field,
            kept: kept.to_string(),
            ignored: ignored.to_string(),
        });
    }
}

/// Whether the discarded record's identifier matches the survivor's. A
/// survivor without one accepts anything.
fn same_identifier(field: &str, kept: &Option<String>, other: &Option<String>) -> bool {
    match (populated(kept), populated(other)) {
        (None, _) => true,
        (Some(a), Some(b)) => same_value(field, a, b),
        (Some(_), None) => false,
    }
}

/// DOIs are case-insensitive
fn same_value(field: &str, a: &str, b: &str) -> bool {
    match field {
        "doi" => a.eq_ignore_ascii_case(b),
        _ => a == b,
    }
}
