//! In-memory collaborators for integration testing.
//!
//! Deterministic `PageFetcher`, `RecordStore` and `Notifier`
//! implementations. Each one is `Clone` and shares its state through
//! `Arc<Mutex<..>>`, so a test keeps a handle after boxing a copy into the
//! monitor.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use freebet_watch::engine::Monitor;
use freebet_watch::extract::{Extractor, PageLayout};
use freebet_watch::fetch::{PageFetcher, PageRequest};
use freebet_watch::notify::message::MessageContext;
use freebet_watch::notify::Notifier;
use freebet_watch::storage::RecordStore;
use freebet_watch::types::*;

pub const PAGE_URL: &str = "https://tips.example.com/free-bet";

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Serves queued responses in order; the last one repeats.
#[derive(Clone, Default)]
pub struct ScriptedFetcher {
    responses: Arc<Mutex<VecDeque<Result<String, FetchError>>>>,
    last: Arc<Mutex<Option<Result<String, FetchError>>>>,
    calls: Arc<Mutex<usize>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&self, markup: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(markup.into()));
    }

    pub fn push_error(&self, err: FetchError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<String, FetchError> {
        *self.calls.lock().unwrap() += 1;
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.responses.lock().unwrap().pop_front() {
            *last = Some(next);
        }
        (*last).clone().unwrap_or_else(|| {
            Err(FetchError::Request {
                url: request.url.clone(),
                message: "no scripted response".to_string(),
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<Option<StoredState>>>,
    writes: Arc<Mutex<usize>>,
    /// If set, `probe` fails with this message.
    offline: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, msg: &str) {
        *self.offline.lock().unwrap() = Some(msg.to_string());
    }

    pub fn snapshot(&self) -> Option<StoredState> {
        self.state.lock().unwrap().clone()
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn probe(&self) -> Result<(), StoreError> {
        match self.offline.lock().unwrap().as_ref() {
            Some(msg) => Err(StoreError::Unavailable(msg.clone())),
            None => Ok(()),
        }
    }

    async fn get_latest(&self) -> Result<Option<StoredState>, StoreError> {
        Ok(self.snapshot())
    }

    async fn put_latest(&self, record: &BetRecord) -> Result<(), StoreError> {
        *self.state.lock().unwrap() = Some(StoredState::from(record));
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Records every attempted message, optionally failing delivery.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    failing: Arc<Mutex<bool>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    /// All attempted messages as `(subject, body)`.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), SendError> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        if *self.failing.lock().unwrap() {
            return Err(SendError::Rejected {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Collaborator handles plus the monitor that owns copies of them.
pub struct Harness {
    pub fetcher: ScriptedFetcher,
    pub store: MemoryStore,
    pub notifier: RecordingNotifier,
    pub monitor: Monitor,
}

pub fn harness() -> Harness {
    let fetcher = ScriptedFetcher::new();
    let store = MemoryStore::new();
    let notifier = RecordingNotifier::new();
    let monitor = Monitor::new(
        Box::new(fetcher.clone()),
        Extractor::new(&PageLayout::default()).unwrap(),
        Box::new(store.clone()),
        Box::new(notifier.clone()),
        PageRequest::new(PAGE_URL, Duration::from_secs(5)),
        MessageContext {
            site_name: "EstrobBet".to_string(),
            page_url: PAGE_URL.to_string(),
        },
    );
    Harness {
        fetcher,
        store,
        notifier,
        monitor,
    }
}

/// A promotion page with the given tip and odds.
pub fn promo_page(names: &str, tip: &str, odds: &str) -> String {
    format!(
        r#"<html><head><title>Free Bet</title></head><body>
        <div class="eael-tabs-content">
          <div id="free-bet-of-the-day-tab">
            <p><strong>{names}</strong></p>
            <p>Match Tip: {tip}</p>
            <p>Match Odds: {odds}</p>
          </div>
          <div id="other-markets-tab"><p>Corners and cards</p></div>
          <div id="V-tab"><p>Both teams to score</p></div>
        </div>
        </body></html>"#
    )
}
