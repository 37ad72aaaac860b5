//! Persistence layer.
//!
//! Defines the `RecordStore` trait and two backends:
//! - `json`: a single JSON document on disk (the local fallback)
//! - `sqlite`: one upserted row in a SQLite database
//!
//! The store holds exactly one logical snapshot, replaced wholesale on
//! every change. It is the only state shared between runs.

pub mod json;
pub mod sqlite;

use async_trait::async_trait;

use crate::config::{StoreBackend, StoreConfig};
use crate::types::{BetRecord, StoreError, StoredState};

/// Abstraction over where the last snapshot lives.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Connectivity probe. `Ok` means reads and writes are expected to work
    /// for this run; an error switches the run to degraded mode.
    async fn probe(&self) -> Result<(), StoreError>;

    /// The most recent snapshot, or `None` if nothing usable is stored.
    async fn get_latest(&self) -> Result<Option<StoredState>, StoreError>;

    /// Replace the stored snapshot with `record`.
    async fn put_latest(&self, record: &BetRecord) -> Result<(), StoreError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Build the configured store.
///
/// Construction never touches the backend; connectivity is checked by
/// `probe` at the start of each run.
pub fn build_store(config: &StoreConfig) -> Result<Box<dyn RecordStore>, StoreError> {
    match config.backend {
        StoreBackend::Json => Ok(Box::new(json::JsonFileStore::new(&config.json_path))),
        StoreBackend::Sqlite => Ok(Box::new(sqlite::SqliteStore::connect_lazy(&config.sqlite_url)?)),
    }
}
