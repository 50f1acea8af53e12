//! Ledger codec integration tests

mod common;

use chrono::{TimeZone, Utc};
use citeledger_core::ledger::{decode, encode, load_ledger, save_ledger};
use citeledger_core::{CitationRecord, CiteError, RecordStore, VerificationOutcome};
use common::{fixture_path, init_tracing, load_fixture, tully};
use proptest::prelude::*;
use tempfile::TempDir;

#[test]
fn test_legacy_ledger_fixture_loads() {
    init_tracing();
    let store = load_ledger(fixture_path("legacy_ledger.json")).unwrap();

    assert_eq!(store.len(), 2);
    let planck = store.get("planck18").unwrap();
    assert_eq!(planck.http_status_doi, Some(200));
    assert_eq!(
        planck.last_verified,
        Some(Utc.with_ymd_and_hms(2024, 5, 14, 8, 31, 2).unwrap() + chrono::Duration::microseconds(518274))
    );
    assert_eq!(planck.notes.as_deref(), Some(""));

    let tully = store.get("t77").unwrap();
    assert_eq!(tully.notes.as_deref(), Some("Tully-Fisher relation"));
    assert!(tully.extra["bibtex_entry"].as_str().unwrap().starts_with("@article{t77"));
}

#[test]
fn test_legacy_ledger_survives_rewrite() {
    let original = decode(&load_fixture("legacy_ledger.json")).unwrap();
    let rewritten = decode(&encode(&original).unwrap()).unwrap();
    assert_eq!(rewritten, original);
}

#[test]
fn test_save_then_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("citations.json");

    let mut record = tully().with_doi("10.1051/0004-6361/201833910");
    record.last_verified = Some(Utc::now());
    record.http_status_ads = Some(0);
    record.verification_outcome = Some(VerificationOutcome::Timeout);
    let store: RecordStore = [record].into_iter().collect();

    save_ledger(&store, &path).unwrap();
    let loaded = load_ledger(&path).unwrap();
    assert_eq!(loaded, store);

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"verification_outcome\": \"timeout\""));
    assert!(text.ends_with("]\n"));
}

#[test]
fn test_missing_ledger_starts_fresh() {
    let dir = TempDir::new().unwrap();
    let store = load_ledger(dir.path().join("absent.json")).unwrap();
    assert!(store.is_empty());
}

#[test]
fn test_corrupt_ledger_file_is_format_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("citations.json");
    std::fs::write(&path, "[{\"citekey\": \"a\", ").unwrap();

    let err = load_ledger(&path).unwrap_err();
    assert!(err.is_format());
}

#[test]
fn test_non_object_entry_is_rejected() {
    let err = decode(r#"[{"citekey": "a", "title": "T", "authors": ["A"], "year": 2000}, 42]"#)
        .unwrap_err();
    assert!(matches!(err, CiteError::Format { position: Some(1), .. }));
}

// === Property-based tests ===

fn arb_record() -> impl Strategy<Value = CitationRecord> {
    (
        "[a-z][a-z0-9:_-]{0,11}",
        "[A-Za-z0-9 &%$#_{}~^\\\\éü]{0,40}[A-Za-z]",
        prop::collection::vec("[A-Z][a-z]{1,8}, [A-Z]\\.", 1..4),
        1900..2025i32,
        (
            proptest::option::of("[A-Z][A-Za-z&. ]{0,20}"),
            proptest::option::of("[0-9]{4}[A-Za-z&.]{5}[0-9]{4}[A-Z]"),
            proptest::option::of("10\\.[0-9]{4,5}/[a-z0-9.]{1,12}"),
            proptest::option::of("[0-9]{4}\\.[0-9]{5}"),
        ),
        (
            proptest::option::of(0i64..4_000_000_000),
            proptest::option::of(prop::sample::select(vec![0u16, 200, 301, 404, 503])),
            any::<bool>(),
            any::<bool>(),
            proptest::option::of(".{0,20}"),
        ),
    )
        .prop_map(
            |(citekey, title, authors, year, (journal, bibcode, doi, arxiv), (ts, status, ads_match, crossref_match, notes))| {
                let mut r = CitationRecord::new(citekey, title, authors, year).unwrap();
                r.journal = journal;
                r.ads_bibcode = bibcode;
                r.doi = doi;
                r.arxiv_id = arxiv;
                r.last_verified = ts.and_then(|secs| Utc.timestamp_opt(secs, 0).single());
                r.http_status_ads = status;
                r.ads_match = ads_match;
                r.crossref_match = crossref_match;
                r.notes = notes;
                r
            },
        )
}

proptest! {
    #[test]
    fn ledger_round_trip(records in prop::collection::vec(arb_record(), 0..12)) {
        let store: RecordStore = records.into_iter().collect();
        let text = encode(&store).unwrap();
        let decoded = decode(&text).unwrap();
        prop_assert_eq!(&decoded, &store);
        prop_assert_eq!(encode(&decoded).unwrap(), text);
    }
}
