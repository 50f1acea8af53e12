//! HTTP transport for link probes

#[cfg(feature = "native")]
mod native;

#[cfg(feature = "native")]
pub use native::HttpClient;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("Request failed: {message}")]
    RequestFailed { message: String },
    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },
    #[error("Timeout")]
    Timeout,
    #[error("Connection error: {message}")]
    Connection { message: String },
}

impl HttpError {
    /// Timeouts and connection errors may succeed on a retry
    pub fn is_transient(&self) -> bool {
        matches!(self, HttpError::Timeout | HttpError::Connection { .. })
    }
}

/// Request method used for an existence probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeMethod {
    Head,
    Get,
}

impl ProbeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeMethod::Head => "HEAD",
            ProbeMethod::Get => "GET",
        }
    }
}

/// Sends one request and reports the response status. Redirects are
/// followed; the body is never read.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    async fn send(&self, method: ProbeMethod, url: &str, timeout: Duration)
        -> Result<u16, HttpError>;
}

/// Only absolute http(s) URLs are probed
pub(crate) fn parse_probe_url(raw: &str) -> Result<Url, HttpError> {
    let invalid = || HttpError::InvalidUrl {
        url: raw.to_string(),
    };
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(invalid()),
    }
}
