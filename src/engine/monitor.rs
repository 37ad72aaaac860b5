//! The run orchestrator.
//!
//! One `run_once` call is one check of the page:
//! fetch → extract → probe store → classify → persist → notify.
//!
//! Every failure inside a run is classified into a `RunOutcome`; nothing
//! here returns an error to the caller. Persistence always happens before
//! notification, and a failed notification never undoes a persisted record.

use anyhow::{Context, Result};
use chrono::Utc;
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::detect::{self, Transition};
use crate::extract::Extractor;
use crate::fetch::{HttpFetcher, PageFetcher, PageRequest};
use crate::notify::message::{self, Message, MessageContext};
use crate::notify::{self, Notifier};
use crate::storage::{self, RecordStore};
use crate::types::{BetRecord, SendError, StoreError, StoredState};

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// Phase a run ended in. Only fetching and extraction can abort a run;
/// deciding always runs to completion, so it has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Fetching,
    Extracting,
    Done,
}

/// Classified result of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Page unchanged since the last stored snapshot.
    NoOp,
    /// No usable previous snapshot; the current one was recorded.
    FirstObservation,
    ChangedAndNotified,
    /// Content changed but the alert could not be delivered.
    ChangedNotifyFailed,
    FetchFailed,
    ExtractFailed,
}

impl RunOutcome {
    pub fn is_failure(self) -> bool {
        matches!(self, Self::FetchFailed | Self::ExtractFailed)
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoOp => "no-op",
            Self::FirstObservation => "first-observation",
            Self::ChangedAndNotified => "changed-and-notified",
            Self::ChangedNotifyFailed => "changed-notify-failed",
            Self::FetchFailed => "fetch-failed",
            Self::ExtractFailed => "extract-failed",
        };
        f.write_str(s)
    }
}

/// Summary of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Phase in which the run ended. `Done` unless it aborted early.
    pub phase: RunPhase,
    /// The extracted record, when extraction succeeded.
    pub record: Option<BetRecord>,
    pub persisted: bool,
    /// The store was unavailable; nothing was read or written.
    pub degraded: bool,
    /// Failure text for `FetchFailed` / `ExtractFailed`.
    pub error: Option<String>,
}

impl RunReport {
    fn aborted(outcome: RunOutcome, phase: RunPhase, error: String) -> Self {
        Self {
            outcome,
            phase,
            record: None,
            persisted: false,
            degraded: false,
            error: Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

pub struct Monitor {
    fetcher: Box<dyn PageFetcher>,
    extractor: Extractor,
    store: Box<dyn RecordStore>,
    notifier: Box<dyn Notifier>,
    request: PageRequest,
    context: MessageContext,
    alert_on_error: bool,
}

impl Monitor {
    pub fn new(
        fetcher: Box<dyn PageFetcher>,
        extractor: Extractor,
        store: Box<dyn RecordStore>,
        notifier: Box<dyn Notifier>,
        request: PageRequest,
        context: MessageContext,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            store,
            notifier,
            request,
            context,
            alert_on_error: false,
        }
    }

    /// Send an error message when a fetch or extraction fails.
    pub fn with_error_alerts(mut self, enabled: bool) -> Self {
        self.alert_on_error = enabled;
        self
    }

    /// Wire up the production collaborators from a validated config.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new()?;
        let extractor = Extractor::new(&cfg.page).context("Invalid page layout")?;
        let store = storage::build_store(&cfg.store).context("Failed to build record store")?;
        let notifier =
            notify::build_notifier(&cfg.notify).context("Failed to build notifier")?;

        info!(
            url = %cfg.monitor.url,
            store = store.name(),
            notifier = notifier.name(),
            "Monitor initialised"
        );

        let request = PageRequest::new(cfg.monitor.url.clone(), cfg.fetch_timeout());
        let context = MessageContext {
            site_name: cfg.monitor.site_name.clone(),
            page_url: cfg.monitor.url.clone(),
        };

        Ok(Self::new(
            Box::new(fetcher),
            extractor,
            store,
            notifier,
            request,
            context,
        )
        .with_error_alerts(cfg.notify.alert_on_error))
    }

    /// Run one check of the page.
    pub async fn run_once(&self) -> RunReport {
        info!(url = %self.request.url, "Checking page");

        // 1. Fetch
        let markup = match self.fetcher.fetch(&self.request).await {
            Ok(markup) => markup,
            Err(e) => {
                warn!(error = %e, "Fetch failed, nothing recorded");
                self.alert_error(&e.to_string()).await;
                return RunReport::aborted(RunOutcome::FetchFailed, RunPhase::Fetching, e.to_string());
            }
        };
        debug!(bytes = markup.len(), "Page fetched");

        // 2. Extract
        let record = match self.extractor.extract(&markup) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Extraction failed, nothing recorded");
                self.alert_error(&e.to_string()).await;
                return RunReport::aborted(
                    RunOutcome::ExtractFailed,
                    RunPhase::Extracting,
                    e.to_string(),
                );
            }
        };
        debug!(
            fingerprint = %record.fingerprint(),
            free_bet_section = record.has_free_bet_section(),
            match_info = record.match_info(),
            "Page extracted"
        );

        // 3. Decide
        let (previous, degraded) = self.load_previous().await;
        let transition = detect::classify(previous.as_ref(), &record);
        info!(%transition, fingerprint = %record.fingerprint(), degraded, "Page classified");

        let persisted = if transition.should_persist() && !degraded {
            self.persist(&record).await
        } else {
            false
        };

        let outcome = match transition {
            Transition::Unchanged => RunOutcome::NoOp,
            Transition::FirstObservation => {
                let ack = message::first_run_ack(&self.context, &record);
                // Ack failure does not change the outcome.
                let _ = self.deliver(&ack).await;
                RunOutcome::FirstObservation
            }
            Transition::Changed => {
                let alert = message::change_alert(&self.context, &record);
                match self.deliver(&alert).await {
                    Ok(()) => RunOutcome::ChangedAndNotified,
                    Err(_) => RunOutcome::ChangedNotifyFailed,
                }
            }
        };

        let report = RunReport {
            outcome,
            phase: RunPhase::Done,
            record: Some(record),
            persisted,
            degraded,
            error: None,
        };
        info!(
            outcome = %report.outcome,
            persisted = report.persisted,
            degraded = report.degraded,
            "Run complete"
        );
        report
    }

    /// Send the test message through the configured notifier.
    pub async fn send_test_notification(&self) -> Result<(), SendError> {
        let msg = message::test_message(&self.context, Utc::now());
        self.deliver(&msg).await
    }

    /// Probe the record store without fetching anything.
    pub async fn test_connection(&self) -> Result<(), StoreError> {
        match self.store.probe().await {
            Ok(()) => {
                info!(store = self.store.name(), "Record store reachable");
                Ok(())
            }
            Err(e) => {
                warn!(store = self.store.name(), error = %e, "Record store unreachable");
                Err(e)
            }
        }
    }

    // -- Internals ----------------------------------------------------------

    /// Previous snapshot and whether this run is degraded.
    async fn load_previous(&self) -> (Option<StoredState>, bool) {
        if let Err(e) = self.store.probe().await {
            warn!(
                store = self.store.name(),
                error = %e,
                "Record store unavailable, running degraded: no history, nothing persisted"
            );
            return (None, true);
        }

        match self.store.get_latest().await {
            Ok(previous) => (previous, false),
            Err(e) => {
                warn!(
                    store = self.store.name(),
                    error = %e,
                    "Failed to read previous snapshot, running degraded"
                );
                (None, true)
            }
        }
    }

    async fn persist(&self, record: &BetRecord) -> bool {
        match self.store.put_latest(record).await {
            Ok(()) => {
                debug!(store = self.store.name(), "Snapshot persisted");
                true
            }
            Err(e) => {
                warn!(store = self.store.name(), error = %e, "Failed to persist snapshot");
                false
            }
        }
    }

    async fn deliver(&self, msg: &Message) -> Result<(), SendError> {
        match self.notifier.send(&msg.subject, &msg.body).await {
            Ok(()) => {
                info!(notifier = self.notifier.name(), subject = %msg.subject, "Notification sent");
                Ok(())
            }
            Err(e) => {
                warn!(notifier = self.notifier.name(), error = %e, "Notification failed");
                Err(e)
            }
        }
    }

    async fn alert_error(&self, error: &str) {
        if self.alert_on_error {
            let msg = message::error_alert(&self.context, error, Utc::now());
            let _ = self.deliver(&msg).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
