//! Response ledger
//!
//! Durable table of in-progress tutor answers to course announcements. A tutor
//! has at most one pending response at any time, whichever announcement it
//! belongs to. Every mutation reads the whole table, changes it in memory and
//! rewrites it in full, so all access goes through one async lock owned by
//! the ledger.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::LedgerError;
use crate::id::{AnnouncementId, OptionId, TutorId};

/// A tutor's in-progress, not yet submitted answer to one announcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingResponse {
    pub announcement_id: AnnouncementId,
    pub tutor_id: TutorId,
    pub selected_option_ids: Vec<OptionId>,
    /// Display labels, index-aligned with `selected_option_ids`
    pub selected_labels: Vec<String>,
}

impl PendingResponse {
    pub fn new(
        tutor_id: TutorId,
        announcement_id: AnnouncementId,
        selected_option_ids: Vec<OptionId>,
        selected_labels: Vec<String>,
    ) -> Self {
        Self {
            announcement_id,
            tutor_id,
            selected_option_ids,
            selected_labels,
        }
    }

    fn validate(&self) -> Result<(), LedgerError> {
        if self.tutor_id.is_empty() {
            return Err(LedgerError::invalid_selection("tutor id is empty"));
        }
        if self.announcement_id.is_empty() {
            return Err(LedgerError::invalid_selection("announcement id is empty"));
        }
        if self.selected_option_ids.is_empty() {
            return Err(LedgerError::invalid_selection("no options selected"));
        }
        if self.selected_option_ids.len() != self.selected_labels.len() {
            return Err(LedgerError::invalid_selection(format!(
                "{} option id(s) but {} label(s)",
                self.selected_option_ids.len(),
                self.selected_labels.len()
            )));
        }
        Ok(())
    }
}

/// Backing storage for the ledger table
///
/// Implementations load and save the table as a whole. `save` must be
/// all-or-nothing: after a failed save the previous table is still what
/// `load` returns.
#[async_trait]
pub trait LedgerStore: Send + Sync + fmt::Debug {
    /// Human readable location, used in errors and logs
    fn location(&self) -> String;

    async fn load(&self) -> Result<Vec<PendingResponse>, LedgerError>;

    async fn save(&self, rows: &[PendingResponse]) -> Result<(), LedgerError>;
}

/// Ledger table kept in a JSON file
///
/// A missing file is an empty table. Anything else that can't be read or
/// parsed is reported as unavailable.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("ledger"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl LedgerStore for FileStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> Result<Vec<PendingResponse>, LedgerError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No ledger file at {}, starting empty", self.location());
                return Ok(Vec::new());
            }
            Err(e) => return Err(LedgerError::unavailable("read", self.location(), e)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| LedgerError::unavailable("read", self.location(), e))
    }

    async fn save(&self, rows: &[PendingResponse]) -> Result<(), LedgerError> {
        let encoded = serde_json::to_vec_pretty(rows)
            .map_err(|e| LedgerError::unavailable("write", self.location(), e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LedgerError::unavailable("write", self.location(), e))?;
        }

        // Write next to the real file and rename over it, so readers only ever
        // see the old table or the new one.
        let temp_path = self.temp_path();
        let write = async {
            let mut file = tokio::fs::File::create(&temp_path).await?;
            file.write_all(&encoded).await?;
            file.sync_all().await?;
            tokio::fs::rename(&temp_path, &self.path).await
        };

        if let Err(e) = write.await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(LedgerError::unavailable("write", self.location(), e));
        }

        Ok(())
    }
}

/// Ledger table kept in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<PendingResponse>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    fn location(&self) -> String {
        "memory".to_string()
    }

    async fn load(&self) -> Result<Vec<PendingResponse>, LedgerError> {
        Ok(self.rows.lock().clone())
    }

    async fn save(&self, rows: &[PendingResponse]) -> Result<(), LedgerError> {
        *self.rows.lock() = rows.to_vec();
        Ok(())
    }
}

/// Single source of truth for pending responses
#[derive(Debug)]
pub struct ResponseLedger {
    store: Arc<dyn LedgerStore>,
    table_lock: tokio::sync::Mutex<()>,
}

impl ResponseLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            table_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Ledger backed by a JSON file at `path`
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileStore::new(path)))
    }

    /// Ledger that only lives as long as the process
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn location(&self) -> String {
        self.store.location()
    }

    /// The tutor's pending response, if there is one
    pub async fn find_pending(
        &self,
        tutor_id: &TutorId,
    ) -> Result<Option<PendingResponse>, LedgerError> {
        let _guard = self.table_lock.lock().await;
        let rows = self.store.load().await?;
        Ok(rows.into_iter().find(|row| &row.tutor_id == tutor_id))
    }

    /// Record a new pending response
    ///
    /// Fails with [`LedgerError::AlreadyPending`] if the tutor already has one,
    /// whichever announcement it is for. The existing entry is left untouched
    /// and returned inside the error.
    pub async fn record_selection(
        &self,
        response: PendingResponse,
    ) -> Result<PendingResponse, LedgerError> {
        response.validate()?;

        let _guard = self.table_lock.lock().await;
        let mut rows = self.store.load().await?;

        if let Some(existing) = rows.iter().find(|row| row.tutor_id == response.tutor_id) {
            debug!(
                "Rejecting selection from tutor {} for {}: {} is still pending",
                response.tutor_id, response.announcement_id, existing.announcement_id
            );
            return Err(LedgerError::already_pending(existing.clone()));
        }

        rows.push(response.clone());
        self.store.save(&rows).await?;

        info!(
            "Recorded pending response from tutor {} for announcement {} ({} option(s))",
            response.tutor_id,
            response.announcement_id,
            response.selected_option_ids.len()
        );
        Ok(response)
    }

    /// Remove and return the tutor's pending response
    ///
    /// Nothing is written when the tutor has no entry.
    pub async fn clear(&self, tutor_id: &TutorId) -> Result<Option<PendingResponse>, LedgerError> {
        let _guard = self.table_lock.lock().await;
        let rows = self.store.load().await?;

        let (removed, kept): (Vec<_>, Vec<_>) =
            rows.into_iter().partition(|row| &row.tutor_id == tutor_id);

        if removed.is_empty() {
            return Ok(None);
        }

        self.store.save(&kept).await?;
        info!(
            "Cleared pending response of tutor {} for announcement {}",
            tutor_id, removed[0].announcement_id
        );
        Ok(removed.into_iter().next())
    }

    /// Drop every pending response, returning how many there were
    pub async fn purge(&self) -> Result<usize, LedgerError> {
        let _guard = self.table_lock.lock().await;
        let rows = self.store.load().await?;
        if rows.is_empty() {
            return Ok(0);
        }
        self.store.save(&[]).await?;
        info!("Purged {} pending response(s) from the ledger", rows.len());
        Ok(rows.len())
    }

    pub async fn pending_count(&self) -> Result<usize, LedgerError> {
        let _guard = self.table_lock.lock().await;
        Ok(self.store.load().await?.len())
    }
}
