//! JSON file store.
//!
//! Saves and loads the last snapshot to/from a single JSON document. The
//! whole file is rewritten on every change (unique temp file + rename), so
//! a reader never sees a half-written document and concurrent writers
//! resolve as last-writer-wins.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::RecordStore;
use crate::types::{BetRecord, StoreError, StoredState};

/// Default snapshot file path.
pub const DEFAULT_STATE_FILE: &str = "last_bet_data.json";

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.display_path(),
            source,
        }
    }

    /// Directory the file lives in; a bare file name means the working dir.
    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn probe(&self) -> Result<(), StoreError> {
        let dir = self.parent_dir();
        let meta = tokio::fs::metadata(dir).await.map_err(|e| {
            StoreError::Unavailable(format!("directory {} not accessible: {e}", dir.display()))
        })?;
        if !meta.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        if meta.permissions().readonly() {
            return Err(StoreError::Unavailable(format!(
                "directory {} is read-only",
                dir.display()
            )));
        }
        Ok(())
    }

    async fn get_latest(&self) -> Result<Option<StoredState>, StoreError> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.display_path(), "No saved snapshot found, first run");
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };

        // A corrupt file is treated as absent so the next write replaces it.
        let state: StoredState = match serde_json::from_str(&json) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %self.display_path(), error = %e, "Snapshot file unreadable, ignoring it");
                return Ok(None);
            }
        };

        if state.fingerprint().is_none() {
            debug!(path = %self.display_path(), "Snapshot file has no hash");
            return Ok(None);
        }

        debug!(path = %self.display_path(), hash = %state.hash, "Snapshot loaded from disk");
        Ok(Some(state))
    }

    async fn put_latest(&self, record: &BetRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&StoredState::from(record))?;

        // Unique per write so concurrent writers never rename each other's file.
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(self.io_error(e));
        }

        debug!(path = %self.display_path(), hash = %record.fingerprint(), "Snapshot saved");
        Ok(())
    }

    fn name(&self) -> &str {
        "json"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
