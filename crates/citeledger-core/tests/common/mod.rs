//! Shared helpers for citeledger-core integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use citeledger_core::{CitationRecord, HttpError, ProbeMethod, ProbeTransport};
use tracing_subscriber::EnvFilter;

/// Route engine logs to the test harness; `RUST_LOG=debug` to see them
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Get the path to a fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_fixtures")
        .join(name)
}

/// Load a fixture file as a string
pub fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|_| panic!("Failed to load fixture: {}", name))
}

pub fn record(citekey: &str, title: &str, year: i32) -> CitationRecord {
    CitationRecord::new(citekey, title, vec!["A. Author".to_string()], year).unwrap()
}

pub fn tully() -> CitationRecord {
    CitationRecord::new(
        "t77",
        "A New Method of Determining Distances to Galaxies",
        vec!["R. Brent Tully".to_string(), "J. Richard Fisher".to_string()],
        1977,
    )
    .unwrap()
    .with_ads_bibcode("1977A&A....54..661T")
}

pub fn doi_url(doi: &str) -> String {
    format!("https://doi.org/{}", doi)
}

/// Long enough that only a timeout or the batch deadline ends the wait
pub const HANG: Duration = Duration::from_secs(3600);

#[derive(Clone)]
struct Route {
    responses: VecDeque<Result<u16, HttpError>>,
    fallback: Result<u16, HttpError>,
    delay: Duration,
}

impl Default for Route {
    fn default() -> Self {
        Self {
            responses: VecDeque::new(),
            fallback: Ok(200),
            delay: Duration::ZERO,
        }
    }
}

/// Transport that answers from a per-URL script. Unscripted URLs answer 200
/// immediately.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<(ProbeMethod, String)>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn route(self, url: &str, update: impl FnOnce(&mut Route)) -> Self {
        {
            let mut routes = self.routes.lock().unwrap();
            update(routes.entry(url.to_string()).or_default());
        }
        self
    }

    /// Always answer `status`
    pub fn respond(self, url: &str, status: u16) -> Self {
        self.route(url, |r| r.fallback = Ok(status))
    }

    /// Always fail with `err`
    pub fn fail(self, url: &str, err: HttpError) -> Self {
        self.route(url, |r| r.fallback = Err(err))
    }

    /// Answer from `responses` in order, then fall back
    pub fn sequence(self, url: &str, responses: Vec<Result<u16, HttpError>>) -> Self {
        self.route(url, |r| r.responses.extend(responses))
    }

    /// Wait `delay` before every answer
    pub fn delay(self, url: &str, delay: Duration) -> Self {
        self.route(url, |r| r.delay = delay)
    }

    pub fn calls(&self) -> Vec<(ProbeMethod, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls().iter().filter(|(_, u)| u == url).count()
    }

    /// Most requests ever outstanding at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight count even when the request future is dropped
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProbeTransport for ScriptedTransport {
    async fn send(
        &self,
        method: ProbeMethod,
        url: &str,
        _timeout: Duration,
    ) -> Result<u16, HttpError> {
        self.calls.lock().unwrap().push((method, url.to_string()));

        let (delay, answer) = {
            let mut routes = self.routes.lock().unwrap();
            let route = routes.entry(url.to_string()).or_default();
            let answer = route
                .responses
                .pop_front()
                .unwrap_or_else(|| route.fallback.clone());
            (route.delay, answer)
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        answer
    }
}
