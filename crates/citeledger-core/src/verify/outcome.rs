//! Probe outcomes and how they are written back onto a record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::populated;
use crate::record::{CitationRecord, VerificationOutcome};

/// Status recorded when a probe produced no HTTP response
pub const NO_RESPONSE_STATUS: u16 = 0;

/// Result of probing one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// The server answered with this status
    Responded(u16),
    /// No answer within the request timeout or the batch deadline
    TimedOut,
    /// No answer at all (DNS, TLS, refused connection, bad URL)
    Failed(String),
}

impl ProbeOutcome {
    /// HTTP status, or `0` when nothing answered
    pub fn status_code(&self) -> u16 {
        match self {
            ProbeOutcome::Responded(status) => *status,
            _ => NO_RESPONSE_STATUS,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Responded(status) if (200..300).contains(status))
    }

    /// 404 and 410 say the resource does not exist
    pub fn is_contradiction(&self) -> bool {
        matches!(self, ProbeOutcome::Responded(404 | 410))
    }

    fn describe(&self) -> Option<String> {
        match self {
            ProbeOutcome::Responded(_) if self.is_success() => None,
            ProbeOutcome::Responded(status) => Some(format!("HTTP {}", status)),
            ProbeOutcome::TimedOut => Some("timed out".to_string()),
            ProbeOutcome::Failed(reason) => Some(reason.clone()),
        }
    }
}

/// What one verification found for one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub citekey: String,
    /// `None` when the record has no ADS link to probe
    pub ads: Option<ProbeOutcome>,
    /// `None` when the record has no DOI
    pub doi: Option<ProbeOutcome>,
    pub outcome: VerificationOutcome,
    /// One line per probe that did not answer 2xx
    pub errors: Vec<String>,
}

impl VerificationResult {
    pub fn new(citekey: impl Into<String>, ads: Option<ProbeOutcome>, doi: Option<ProbeOutcome>) -> Self {
        let mut errors = Vec::new();
        for (label, probe) in [("ads", &ads), ("doi", &doi)] {
            if let Some(message) = probe.as_ref().and_then(ProbeOutcome::describe) {
                errors.push(format!("{}: {}", label, message));
            }
        }
        let outcome = overall_outcome(ads.as_ref(), doi.as_ref());
        Self {
            citekey: citekey.into(),
            ads,
            doi,
            outcome,
            errors,
        }
    }

    /// Result for a record whose probes were cut off by the batch deadline
    pub fn deadline_expired(record: &CitationRecord) -> Self {
        let ads = record.effective_ads_url().map(|_| ProbeOutcome::TimedOut);
        let doi = record.doi_url().map(|_| ProbeOutcome::TimedOut);
        let mut result = Self::new(record.citekey.clone(), ads, doi);
        result.outcome = VerificationOutcome::Timeout;
        result.errors.push("batch deadline expired".to_string());
        result
    }

    pub fn ads_reachable(&self) -> bool {
        self.ads.as_ref().is_some_and(ProbeOutcome::is_success)
    }

    pub fn doi_reachable(&self) -> bool {
        self.doi.as_ref().is_some_and(ProbeOutcome::is_success)
    }

    pub fn ads_status(&self) -> Option<u16> {
        self.ads.as_ref().map(ProbeOutcome::status_code)
    }

    pub fn doi_status(&self) -> Option<u16> {
        self.doi.as_ref().map(ProbeOutcome::status_code)
    }
}

fn overall_outcome(ads: Option<&ProbeOutcome>, doi: Option<&ProbeOutcome>) -> VerificationOutcome {
    let probes: Vec<&ProbeOutcome> = ads.into_iter().chain(doi).collect();
    if probes.is_empty() {
        VerificationOutcome::Skipped
    } else if probes.iter().any(|p| matches!(p, ProbeOutcome::TimedOut)) {
        VerificationOutcome::Timeout
    } else if probes.iter().any(|p| matches!(p, ProbeOutcome::Failed(_))) {
        VerificationOutcome::Failed
    } else if probes.iter().all(|p| p.is_success()) {
        VerificationOutcome::Reachable
    } else {
        VerificationOutcome::Unreachable
    }
}

/// Write a verification result onto its record
///
/// Statuses are overwritten by every run. A match flag only changes on
/// evidence: 2xx sets it, 404/410 clears it, anything else leaves it alone.
pub fn apply_verification(
    record: &mut CitationRecord,
    result: &VerificationResult,
    now: DateTime<Utc>,
) {
    if let Some(probe) = &result.ads {
        record.http_status_ads = Some(probe.status_code());
        update_match(&mut record.ads_match, probe);
    }
    if let Some(probe) = &result.doi {
        record.http_status_doi = Some(probe.status_code());
        update_match(&mut record.crossref_match, probe);
    }
    if populated(&record.publisher_url).is_none() {
        if let Some(url) = record.doi_url() {
            record.publisher_url = Some(url);
        }
    }
    record.last_verified = Some(now);
    record.verification_outcome = Some(result.outcome);
}

fn update_match(flag: &mut bool, probe: &ProbeOutcome) {
    if probe.is_success() {
        *flag = true;
    } else if probe.is_contradiction() {
        *flag = false;
    }
}
