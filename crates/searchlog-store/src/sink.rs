use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use searchlog_core::{SearchRecord, SearchlogError, SearchlogResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::warn;

// ---------------------------------------------------------------------------
// PersistentSink trait
// ---------------------------------------------------------------------------

/// Durable destination for the final coalesced search of each session.
///
/// `persist` appends exactly one record and reports success or failure only.
/// Timeouts, if any, belong to the sink's own client.
#[async_trait]
pub trait PersistentSink: Send + Sync {
    /// Append one record.
    async fn persist(&self, record: &SearchRecord) -> SearchlogResult<()>;
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// Keeps persisted records in memory, in arrival order.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<SearchRecord>>,
}

impl MemorySink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything persisted so far.
    pub fn records(&self) -> Vec<SearchRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl PersistentSink for MemorySink {
    async fn persist(&self, record: &SearchRecord) -> SearchlogResult<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JsonlSink
// ---------------------------------------------------------------------------

/// One line of a [`JsonlSink`] file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonlLine {
    /// Session the search was coalesced under.
    pub session_id: String,
    /// Final keyword.
    pub keyword: String,
    /// User id, possibly empty.
    pub user_id: String,
    /// When the flusher handed the record over.
    pub flushed_at: DateTime<Utc>,
}

/// Appends one JSON object per line to a file.
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    /// Create the sink, making sure the parent directory exists.
    pub async fn new(path: impl Into<PathBuf>) -> SearchlogResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(Self { path })
    }

    /// File the sink appends to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every line written so far. A missing file reads as empty;
    /// lines that do not parse are skipped.
    pub async fn read_all(&self) -> SearchlogResult<Vec<JsonlLine>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = tokio::fs::read_to_string(&self.path).await?;
        let mut lines = Vec::new();
        for (number, raw) in data.lines().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(raw) {
                Ok(line) => lines.push(line),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = number + 1,
                    error = %e,
                    "Skipping unparseable search log line"
                ),
            }
        }
        Ok(lines)
    }
}

#[async_trait]
impl PersistentSink for JsonlSink {
    async fn persist(&self, record: &SearchRecord) -> SearchlogResult<()> {
        let line = JsonlLine {
            session_id: record.session_id.clone(),
            keyword: record.keyword.clone(),
            user_id: record.user_id.clone(),
            flushed_at: Utc::now(),
        };
        let mut text = serde_json::to_string(&line)?;
        text.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(SearchlogError::sink)?;
        file.write_all(text.as_bytes())
            .await
            .map_err(SearchlogError::sink)?;
        file.flush().await.map_err(SearchlogError::sink)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
