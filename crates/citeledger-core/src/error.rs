//! Error types for citeledger-core
//!
//! Network trouble during verification is not represented here. Timeouts,
//! refused connections and non-2xx responses are recorded on the record as
//! verification data (see `verify::ProbeOutcome`).

use std::fmt;

use thiserror::Error;

/// Result type alias for citeledger operations
pub type Result<T> = std::result::Result<T, CiteError>;

/// Which persisted format a `CiteError::Format` came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSource {
    Ledger,
    Bibliography,
}

impl fmt::Display for FormatSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatSource::Ledger => f.write_str("ledger"),
            FormatSource::Bibliography => f.write_str("bibliography"),
        }
    }
}

/// Main error type for citeledger operations
#[derive(Error, Debug)]
pub enum CiteError {
    /// A record failed a required-field or range check
    #[error("invalid record `{citekey}`: {field}: {message}")]
    Validation {
        citekey: String,
        field: &'static str,
        message: String,
    },

    /// Lookup of an unknown citekey
    #[error("citation not found: {0}")]
    NotFound(String),

    /// Persisted text is structurally invalid
    #[error("{source_kind} format error{}: {message}", fmt_position(.position))]
    Format {
        source_kind: FormatSource,
        /// Entry index (ledger) or line number (bibliography), when known
        position: Option<usize>,
        message: String,
    },

    /// Configuration could not be read or parsed
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn fmt_position(position: &Option<usize>) -> String {
    position.map(|p| format!(" at {p}")).unwrap_or_default()
}

impl CiteError {
    pub(crate) fn validation(
        citekey: &str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        CiteError::Validation {
            citekey: citekey.to_string(),
            field,
            message: message.into(),
        }
    }

    pub(crate) fn ledger_format(position: Option<usize>, message: impl Into<String>) -> Self {
        CiteError::Format {
            source_kind: FormatSource::Ledger,
            position,
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CiteError::Validation { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CiteError::NotFound(_))
    }

    pub fn is_format(&self) -> bool {
        matches!(self, CiteError::Format { .. })
    }
}

impl From<toml::de::Error> for CiteError {
    fn from(err: toml::de::Error) -> Self {
        CiteError::Config(err.to_string())
    }
}
