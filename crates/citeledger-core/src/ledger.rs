//! Ledger codec: the record store as a JSON array
//!
//! The ledger is the lossless persistence format. Records are written sorted
//! by citekey so that re-encoding an unchanged store produces identical text.
//! Keys this version does not know about are carried through untouched.

use std::path::Path;

use serde_json::Value;

use crate::error::{CiteError, Result};
use crate::record::CitationRecord;
use crate::store::RecordStore;

/// Serialize every record, sorted by citekey, as a pretty-printed JSON array
pub fn encode(store: &RecordStore) -> Result<String> {
    let records = store.all();
    serde_json::to_string_pretty(&records).map_err(|e| CiteError::ledger_format(None, e.to_string()))
}

/// Parse a ledger. Any structurally invalid entry fails the whole decode with
/// the entry's index; nothing is partially loaded.
pub fn decode(text: &str) -> Result<RecordStore> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| CiteError::ledger_format(None, e.to_string()))?;
    let Value::Array(entries) = value else {
        return Err(CiteError::ledger_format(None, "expected a JSON array of records"));
    };

    let mut store = RecordStore::new();
    for (index, entry) in entries.into_iter().enumerate() {
        if !entry.is_object() {
            return Err(CiteError::ledger_format(Some(index), "entry is not a JSON object"));
        }
        let record: CitationRecord = serde_json::from_value(entry)
            .map_err(|e| CiteError::ledger_format(Some(index), e.to_string()))?;
        let citekey = record.citekey.clone();
        let replaced = store
            .insert(record)
            .map_err(|e| CiteError::ledger_format(Some(index), e.to_string()))?;
        if replaced.is_some() {
            tracing::warn!(%citekey, index, "Duplicate citekey in ledger, later entry wins");
        }
    }
    Ok(store)
}

/// Load a ledger file. A missing file is an empty ledger.
pub fn load_ledger(path: impl AsRef<Path>) -> Result<RecordStore> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!(path = %path.display(), "No ledger found, starting fresh");
        return Ok(RecordStore::new());
    }
    let text = std::fs::read_to_string(path)?;
    let store = decode(&text)?;
    tracing::info!(path = %path.display(), records = store.len(), "Loaded ledger");
    Ok(store)
}

/// Write the ledger, creating parent directories as needed
pub fn save_ledger(store: &RecordStore, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut text = encode(store)?;
    text.push('\n');
    std::fs::write(path, text)?;
    tracing::info!(path = %path.display(), records = store.len(), "Saved ledger");
    Ok(())
}
