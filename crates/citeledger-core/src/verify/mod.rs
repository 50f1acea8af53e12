//! Link verification
//!
//! The `Verifier` probes a record's ADS and DOI links and records what it
//! saw. Network trouble is data, not an error: timeouts, refused connections
//! and 404s all end up as status codes on the record. Only invalid records and
//! unknown citekeys produce a `CiteError`.
//!
//! Batches run records concurrently up to a limit and return results aligned
//! with the input order. Records still unfinished at the batch deadline are
//! marked `timeout`.

mod http;
mod outcome;

pub use http::{HttpError, ProbeMethod, ProbeTransport};
#[cfg(feature = "native")]
pub use http::HttpClient;
pub use outcome::{apply_verification, ProbeOutcome, VerificationResult, NO_RESPONSE_STATUS};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::config::VerificationConfig;
use crate::error::Result;
use crate::record::{CitationRecord, VerificationOutcome};
use crate::store::RecordStore;

pub struct Verifier {
    transport: Arc<dyn ProbeTransport>,
    timeout: Duration,
    retry_count: u32,
    retry_backoff: Duration,
}

impl Verifier {
    /// Verifier over `transport` with default timeout and retry settings
    pub fn new(transport: Arc<dyn ProbeTransport>) -> Self {
        Self::with_config(transport, &VerificationConfig::default())
    }

    pub fn with_config(transport: Arc<dyn ProbeTransport>, config: &VerificationConfig) -> Self {
        Self {
            transport,
            timeout: config.timeout(),
            retry_count: config.retry_count,
            retry_backoff: config.retry_backoff(),
        }
    }

    /// Verifier backed by a reqwest client
    #[cfg(feature = "native")]
    pub fn from_config(config: &VerificationConfig) -> Result<Self> {
        let client = HttpClient::new(&config.user_agent)
            .map_err(|e| crate::error::CiteError::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self::with_config(Arc::new(client), config))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe one URL: HEAD, then GET if the server does not support HEAD.
    /// Transient failures are retried with doubling backoff.
    pub async fn probe_url(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        if let Err(err) = http::parse_probe_url(url) {
            tracing::warn!(url, error = %err, "Not probing invalid URL");
            return ProbeOutcome::Failed(err.to_string());
        }

        let mut backoff = self.retry_backoff;
        let mut attempt = 0;
        loop {
            match self.send_with_fallback(url, timeout).await {
                Ok(status) => return ProbeOutcome::Responded(status),
                Err(err) if err.is_transient() && attempt < self.retry_count => {
                    attempt += 1;
                    tracing::warn!(url, attempt, error = %err, "Probe failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(HttpError::Timeout) => {
                    tracing::warn!(url, "Probe timed out");
                    return ProbeOutcome::TimedOut;
                }
                Err(err) => {
                    tracing::warn!(url, error = %err, "Probe failed");
                    return ProbeOutcome::Failed(err.to_string());
                }
            }
        }
    }

    async fn send_with_fallback(&self, url: &str, timeout: Duration) -> std::result::Result<u16, HttpError> {
        let status = self.send(ProbeMethod::Head, url, timeout).await?;
        if matches!(status, 405 | 501) {
            return self.send(ProbeMethod::Get, url, timeout).await;
        }
        Ok(status)
    }

    async fn send(
        &self,
        method: ProbeMethod,
        url: &str,
        timeout: Duration,
    ) -> std::result::Result<u16, HttpError> {
        let status = tokio::time::timeout(timeout, self.transport.send(method, url, timeout))
            .await
            .map_err(|_| HttpError::Timeout)??;
        tracing::debug!(url, method = method.as_str(), status, "Probed");
        Ok(status)
    }

    /// Probe a record's links without touching it
    pub async fn check(&self, record: &CitationRecord, timeout: Duration) -> Result<VerificationResult> {
        record.validate()?;
        Ok(self.probe_record(record, timeout).await)
    }

    async fn probe_record(&self, record: &CitationRecord, timeout: Duration) -> VerificationResult {
        let ads_url = record.effective_ads_url();
        let doi_url = record.doi_url();
        let (ads, doi) = tokio::join!(
            self.probe_optional(ads_url.as_deref(), timeout),
            self.probe_optional(doi_url.as_deref(), timeout),
        );
        VerificationResult::new(record.citekey.clone(), ads, doi)
    }

    async fn probe_optional(&self, url: Option<&str>, timeout: Duration) -> Option<ProbeOutcome> {
        match url {
            Some(url) => Some(self.probe_url(url, timeout).await),
            None => None,
        }
    }

    /// Probe a record's links and record the outcome on it
    pub async fn verify(&self, record: &mut CitationRecord, timeout: Duration) -> Result<VerificationResult> {
        let result = self.check(record, timeout).await?;
        apply_verification(record, &result, Utc::now());
        Ok(result)
    }

    /// Verify one stored record by citekey
    pub async fn verify_entry(&self, store: &mut RecordStore, citekey: &str) -> Result<VerificationResult> {
        let record = store.get_mut(citekey)?;
        self.verify(record, self.timeout).await
    }

    /// Verify many records, at most `concurrency_limit` at a time.
    ///
    /// Result `i` belongs to `records[i]`. Every record is validated before
    /// any request goes out, so an invalid record fails the call without side
    /// effects.
    pub async fn verify_batch(
        &self,
        records: &mut [CitationRecord],
        concurrency_limit: usize,
        deadline: Instant,
    ) -> Result<Vec<VerificationResult>> {
        for record in records.iter() {
            record.validate()?;
        }

        let semaphore = Semaphore::new(concurrency_limit.max(1));
        let timeout = self.timeout;
        let checks = records.iter().map(|record| {
            let semaphore = &semaphore;
            async move {
                let probe = async {
                    let _permit = semaphore.acquire().await;
                    self.probe_record(record, timeout).await
                };
                match tokio::time::timeout_at(deadline, probe).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!(citekey = %record.citekey, "Batch deadline expired before verification finished");
                        VerificationResult::deadline_expired(record)
                    }
                }
            }
        });
        let results = join_all(checks).await;

        let now = Utc::now();
        for (record, result) in records.iter_mut().zip(&results) {
            apply_verification(record, result, now);
        }

        log_batch_summary(&results);
        Ok(results)
    }

    /// Verify stored records by citekey. Results follow `citekeys` order.
    /// Unknown citekeys fail the call before any request goes out.
    pub async fn verify_store(
        &self,
        store: &mut RecordStore,
        citekeys: &[&str],
        concurrency_limit: usize,
        deadline: Instant,
    ) -> Result<Vec<VerificationResult>> {
        let mut records = citekeys
            .iter()
            .map(|key| store.get(key).cloned())
            .collect::<Result<Vec<_>>>()?;

        let results = self.verify_batch(&mut records, concurrency_limit, deadline).await?;

        for record in records {
            store.insert(record)?;
        }
        Ok(results)
    }

    /// Verify every record in the store
    pub async fn verify_all(
        &self,
        store: &mut RecordStore,
        concurrency_limit: usize,
        deadline: Instant,
    ) -> Result<Vec<VerificationResult>> {
        let keys: Vec<String> = store.keys().map(str::to_string).collect();
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.verify_store(store, &keys, concurrency_limit, deadline).await
    }
}

fn log_batch_summary(results: &[VerificationResult]) {
    let count = |outcome: VerificationOutcome| results.iter().filter(|r| r.outcome == outcome).count();
    tracing::info!(
        records = results.len(),
        ads_reachable = results.iter().filter(|r| r.ads_reachable()).count(),
        doi_reachable = results.iter().filter(|r| r.doi_reachable()).count(),
        unreachable = count(VerificationOutcome::Unreachable),
        failed = count(VerificationOutcome::Failed),
        timeouts = count(VerificationOutcome::Timeout),
        "Verified citations"
    );
}
