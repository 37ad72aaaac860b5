//! SQLite record store.
//!
//! Keeps the snapshot as a single row (`id = 1`) that is upserted on every
//! change. SQLite serialises writers, so concurrent invocations resolve as
//! last-writer-wins on that one row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use super::RecordStore;
use crate::types::{BetRecord, StoreError, StoredState};

/// Default database location.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://freebet_watch.db";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create the pool without connecting; the first query opens the file.
    pub fn connect_lazy(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        // One connection: a single run never needs more, and it keeps
        // `sqlite::memory:` databases coherent.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy_with(options);

        Ok(Self { pool })
    }

    /// Create the snapshot table if it does not exist yet.
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bet_snapshot (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                hash TEXT NOT NULL,
                match_names TEXT NOT NULL,
                match_info TEXT NOT NULL,
                match_tip TEXT NOT NULL,
                match_odds TEXT NOT NULL,
                free_bet_content TEXT NOT NULL,
                has_no_basic_tips INTEGER NOT NULL,
                v_tab_content TEXT NOT NULL,
                captured_at TEXT NOT NULL,
                full_html TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn probe(&self) -> Result<(), StoreError> {
        self.ensure_schema().await?;
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_latest(&self) -> Result<Option<StoredState>, StoreError> {
        self.ensure_schema().await?;

        let row = sqlx::query(
            r#"
            SELECT hash, match_names, match_info, match_tip, match_odds,
                   free_bet_content, has_no_basic_tips, v_tab_content,
                   captured_at, full_html
            FROM bet_snapshot
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            debug!("No snapshot row yet");
            return Ok(None);
        };

        let captured_at: String = row.try_get("captured_at")?;
        let state = StoredState {
            hash: row.try_get("hash")?,
            match_names: row.try_get("match_names")?,
            match_info: row.try_get("match_info")?,
            match_tip: row.try_get("match_tip")?,
            match_odds: row.try_get("match_odds")?,
            free_bet_content: row.try_get("free_bet_content")?,
            has_no_basic_tips: row.try_get("has_no_basic_tips")?,
            v_tab_content: row.try_get("v_tab_content")?,
            timestamp: DateTime::parse_from_rfc3339(&captured_at)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            full_html: row.try_get("full_html")?,
        };

        if state.fingerprint().is_none() {
            return Ok(None);
        }
        Ok(Some(state))
    }

    async fn put_latest(&self, record: &BetRecord) -> Result<(), StoreError> {
        self.ensure_schema().await?;

        sqlx::query(
            r#"
            INSERT INTO bet_snapshot (
                id, hash, match_names, match_info, match_tip, match_odds,
                free_bet_content, has_no_basic_tips, v_tab_content,
                captured_at, full_html
            )
            VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                hash = excluded.hash,
                match_names = excluded.match_names,
                match_info = excluded.match_info,
                match_tip = excluded.match_tip,
                match_odds = excluded.match_odds,
                free_bet_content = excluded.free_bet_content,
                has_no_basic_tips = excluded.has_no_basic_tips,
                v_tab_content = excluded.v_tab_content,
                captured_at = excluded.captured_at,
                full_html = excluded.full_html
            "#,
        )
        .bind(record.fingerprint().as_str())
        .bind(record.match_names())
        .bind(record.match_info())
        .bind(record.match_tip())
        .bind(record.match_odds())
        .bind(record.free_bet_section_text())
        .bind(record.has_no_basic_tips())
        .bind(record.secondary_section_text())
        .bind(record.captured_at().to_rfc3339())
        .bind(record.raw_sections_html())
        .execute(&self.pool)
        .await?;

        debug!(hash = %record.fingerprint(), "Snapshot row upserted");
        Ok(())
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
