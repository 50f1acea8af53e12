//! citeledger-core: citation records for a research-writing pipeline
//!
//! This library provides:
//! - A validated citation record model and an owned, in-memory record store
//! - Duplicate detection by normalized title and year, with field merging
//! - Concurrent link verification against ADS and DOI resolvers
//! - Lossless JSON ledger persistence
//! - BibTeX output for LaTeX builds, and best-effort BibTeX input
//!
//! A typical run loads the ledger, inserts or imports records, deduplicates,
//! verifies, and writes both the ledger and the bibliography back out:
//!
//! ```no_run
//! # async fn run() -> citeledger_core::Result<()> {
//! use citeledger_core::{ledger, BibliographyCodec, CiteLedgerConfig, Verifier};
//!
//! let config = CiteLedgerConfig::load_or_default()?;
//! let mut store = ledger::load_ledger("citations.json")?;
//! store.deduplicate(config.dedup.strategy);
//!
//! let verifier = Verifier::from_config(&config.verification)?;
//! let deadline = tokio::time::Instant::now() + config.verification.batch_deadline();
//! verifier
//!     .verify_all(&mut store, config.verification.concurrency(), deadline)
//!     .await?;
//!
//! ledger::save_ledger(&store, "citations.json")?;
//! let codec = BibliographyCodec::from_config(&config.bibliography);
//! citeledger_core::bibliography::write_bibliography(&codec, &store, "references.bib")?;
//! # Ok(())
//! # }
//! ```

pub mod bibliography;
pub mod config;
pub mod error;
pub mod identifiers;
pub mod ledger;
pub mod record;
pub mod store;
pub mod verify;

pub use bibliography::{BibliographyCodec, BibliographyDecode, BibliographyDiagnostic};
pub use config::{BibliographyConfig, CiteLedgerConfig, DedupConfig, VerificationConfig};
pub use error::{CiteError, FormatSource, Result};
pub use record::{CitationRecord, VerificationOutcome};
pub use store::{
    DedupReport, DedupStrategy, DuplicateGroup, IdentityKey, MergeAnomaly, RecordStore,
    VerificationSummary,
};
pub use verify::{
    apply_verification, HttpError, ProbeMethod, ProbeOutcome, ProbeTransport, VerificationResult,
    Verifier,
};
#[cfg(feature = "native")]
pub use verify::HttpClient;
