//! SQLite-backed debounce state and sink.
//!
//! Both types keep one [`rusqlite::Connection`] behind a mutex and run every
//! statement on the blocking thread pool. Pointing `serve` and a standalone
//! `flush` worker at the same database file lets them share pending sessions.

use crate::backend::{ActivityIndex, DebounceBackend, EntryStore};
use crate::sink::PersistentSink;
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use searchlog_core::{ActivityRecord, SearchRecord, SearchlogError, SearchlogResult};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const DEBOUNCE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS debounce_entries (
    session_id TEXT PRIMARY KEY,
    payload    BLOB NOT NULL
);
CREATE TABLE IF NOT EXISTS debounce_index (
    session_id TEXT PRIMARY KEY,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS debounce_index_updated_at ON debounce_index (updated_at);
";

const SEARCH_LOGS_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS search_logs (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    keyword    TEXT NOT NULL,
    user_id    TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
";

type SharedConnection = Arc<Mutex<Connection>>;

fn open_connection(path: &Path, schema: &str) -> SearchlogResult<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path).map_err(SearchlogError::store)?;
    debug!(path = %path.display(), "Opened SQLite connection");
    prepare_connection(conn, schema)
}

fn prepare_connection(conn: Connection, schema: &str) -> SearchlogResult<Connection> {
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(SearchlogError::store)?;
    // journal_mode answers with a row, so it cannot go through execute_batch.
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
        .map_err(SearchlogError::store)?;
    conn.execute_batch(schema).map_err(SearchlogError::store)?;
    Ok(conn)
}

/// Run `f` against the shared connection on the blocking pool.
async fn with_conn<T, F>(
    conn: &SharedConnection,
    f: F,
) -> Result<rusqlite::Result<T>, tokio::task::JoinError>
where
    F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let conn = Arc::clone(conn);
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.lock();
        f(&mut guard)
    })
    .await
}

// ---------------------------------------------------------------------------
// SqliteBackend
// ---------------------------------------------------------------------------

/// Entry cache and activity index in two SQLite tables.
pub struct SqliteBackend {
    conn: SharedConnection,
}

impl SqliteBackend {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> SearchlogResult<Self> {
        let conn = open_connection(path.as_ref(), DEBOUNCE_SCHEMA)?;
        info!(path = %path.as_ref().display(), "SQLite debounce backend ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// A private in-memory database.
    pub fn in_memory() -> SearchlogResult<Self> {
        let conn = Connection::open_in_memory().map_err(SearchlogError::store)?;
        let conn = prepare_connection(conn, DEBOUNCE_SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, f: F) -> SearchlogResult<T>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        with_conn(&self.conn, f)
            .await
            .map_err(SearchlogError::store)?
            .map_err(SearchlogError::store)
    }
}

fn upsert_entry(conn: &Connection, session_id: &str, payload: &[u8]) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO debounce_entries (session_id, payload) VALUES (?1, ?2)
         ON CONFLICT(session_id) DO UPDATE SET payload = excluded.payload",
        params![session_id, payload],
    )
}

fn upsert_score(conn: &Connection, session_id: &str, updated_at: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO debounce_index (session_id, updated_at) VALUES (?1, ?2)
         ON CONFLICT(session_id) DO UPDATE SET updated_at = excluded.updated_at",
        params![session_id, updated_at],
    )
}

fn select_payload(conn: &Connection, session_id: &str) -> rusqlite::Result<Option<Vec<u8>>> {
    conn.query_row(
        "SELECT payload FROM debounce_entries WHERE session_id = ?1",
        params![session_id],
        |row| row.get(0),
    )
    .optional()
}

fn select_score(conn: &Connection, session_id: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT updated_at FROM debounce_index WHERE session_id = ?1",
        params![session_id],
        |row| row.get(0),
    )
    .optional()
}

fn count_rows(conn: &Connection, table: &str) -> rusqlite::Result<usize> {
    let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(usize::try_from(n).unwrap_or_default())
}

#[async_trait]
impl EntryStore for SqliteBackend {
    async fn put(&self, session_id: &str, payload: Vec<u8>) -> SearchlogResult<()> {
        let id = session_id.to_string();
        self.run(move |conn| upsert_entry(conn, &id, &payload))
            .await
            .map(|_| ())
    }

    async fn get(&self, session_id: &str) -> SearchlogResult<Option<Vec<u8>>> {
        let id = session_id.to_string();
        self.run(move |conn| select_payload(conn, &id)).await
    }

    async fn delete(&self, session_id: &str) -> SearchlogResult<()> {
        let id = session_id.to_string();
        self.run(move |conn| {
            conn.execute(
                "DELETE FROM debounce_entries WHERE session_id = ?1",
                params![id],
            )
        })
        .await
        .map(|_| ())
    }

    async fn entry_count(&self) -> SearchlogResult<usize> {
        self.run(|conn| count_rows(conn, "debounce_entries")).await
    }
}

#[async_trait]
impl ActivityIndex for SqliteBackend {
    async fn record(&self, session_id: &str, updated_at: i64) -> SearchlogResult<()> {
        let id = session_id.to_string();
        self.run(move |conn| upsert_score(conn, &id, updated_at))
            .await
            .map(|_| ())
    }

    async fn range_up_to(&self, cutoff: i64) -> SearchlogResult<Vec<ActivityRecord>> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, updated_at FROM debounce_index WHERE updated_at <= ?1",
            )?;
            let rows = stmt.query_map(params![cutoff], |row| {
                Ok(ActivityRecord::new(row.get::<_, String>(0)?, row.get(1)?))
            })?;
            let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
    }

    async fn score(&self, session_id: &str) -> SearchlogResult<Option<i64>> {
        let id = session_id.to_string();
        self.run(move |conn| select_score(conn, &id)).await
    }

    async fn remove(&self, session_id: &str) -> SearchlogResult<()> {
        let id = session_id.to_string();
        self.run(move |conn| {
            conn.execute(
                "DELETE FROM debounce_index WHERE session_id = ?1",
                params![id],
            )
        })
        .await
        .map(|_| ())
    }

    async fn tracked_count(&self) -> SearchlogResult<usize> {
        self.run(|conn| count_rows(conn, "debounce_index")).await
    }
}

#[async_trait]
impl DebounceBackend for SqliteBackend {
    async fn put_tracked(
        &self,
        session_id: &str,
        payload: Vec<u8>,
        updated_at: i64,
    ) -> SearchlogResult<()> {
        let id = session_id.to_string();
        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            upsert_entry(&tx, &id, &payload)?;
            upsert_score(&tx, &id, updated_at)?;
            tx.commit()
        })
        .await
    }

    async fn release_if_unchanged(
        &self,
        session_id: &str,
        expected: Option<&[u8]>,
        updated_at: i64,
    ) -> SearchlogResult<bool> {
        let id = session_id.to_string();
        let expected = expected.map(<[u8]>::to_vec);
        self.run(move |conn| {
            // Take the write lock before reading: a deferred transaction whose
            // snapshot goes stale fails its first write with SQLITE_BUSY_SNAPSHOT.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let current = select_payload(&tx, &id)?;
            let score = select_score(&tx, &id)?;
            if current != expected || score != Some(updated_at) {
                return Ok(false);
            }
            tx.execute(
                "DELETE FROM debounce_entries WHERE session_id = ?1",
                params![id],
            )?;
            tx.execute(
                "DELETE FROM debounce_index WHERE session_id = ?1",
                params![id],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// SqliteSink
// ---------------------------------------------------------------------------

/// Appends flushed searches to a `search_logs` table.
pub struct SqliteSink {
    conn: SharedConnection,
}

impl SqliteSink {
    /// Open (or create) the database at `path` and ensure the table exists.
    pub fn open(path: impl AsRef<Path>) -> SearchlogResult<Self> {
        let conn = open_connection(path.as_ref(), SEARCH_LOGS_SCHEMA)?;
        info!(path = %path.as_ref().display(), "SQLite sink ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// A private in-memory database.
    pub fn in_memory() -> SearchlogResult<Self> {
        let conn = Connection::open_in_memory().map_err(SearchlogError::store)?;
        let conn = prepare_connection(conn, SEARCH_LOGS_SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Most recent rows first, at most `limit`.
    pub async fn recent(&self, limit: usize) -> SearchlogResult<Vec<SearchRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        with_conn(&self.conn, move |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, keyword, user_id FROM search_logs ORDER BY id DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], |row| {
                Ok(SearchRecord {
                    session_id: row.get(0)?,
                    keyword: row.get(1)?,
                    user_id: row.get(2)?,
                })
            })?;
            let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
        .map_err(SearchlogError::store)?
        .map_err(SearchlogError::store)
    }
}

#[async_trait]
impl PersistentSink for SqliteSink {
    async fn persist(&self, record: &SearchRecord) -> SearchlogResult<()> {
        let record = record.clone();
        with_conn(&self.conn, move |conn| {
            conn.execute(
                "INSERT INTO search_logs (session_id, keyword, user_id) VALUES (?1, ?2, ?3)",
                params![record.session_id, record.keyword, record.user_id],
            )
        })
        .await
        .map_err(SearchlogError::sink)?
        .map(|_| ())
        .map_err(SearchlogError::sink)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_tracked_writes_both_tables() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.put_tracked("s1", b"{}".to_vec(), 7).await.unwrap();

        assert_eq!(backend.get("s1").await.unwrap(), Some(b"{}".to_vec()));
        assert_eq!(backend.score("s1").await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn record_is_an_upsert() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.record("s1", 1).await.unwrap();
        backend.record("s1", 9).await.unwrap();

        assert_eq!(backend.tracked_count().await.unwrap(), 1);
        assert!(backend.range_up_to(8).await.unwrap().is_empty());
        assert_eq!(
            backend.range_up_to(9).await.unwrap(),
            vec![ActivityRecord::new("s1", 9)]
        );
    }

    #[tokio::test]
    async fn release_checks_payload_and_score() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.put_tracked("s1", b"new".to_vec(), 4).await.unwrap();

        assert!(!backend
            .release_if_unchanged("s1", Some(b"old".as_slice()), 4)
            .await
            .unwrap());
        assert!(backend
            .release_if_unchanged("s1", Some(b"new".as_slice()), 4)
            .await
            .unwrap());
        assert_eq!(backend.entry_count().await.unwrap(), 0);
        assert_eq!(backend.tracked_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sink_inserts_rows() {
        let sink = SqliteSink::in_memory().unwrap();
        let record = SearchRecord {
            session_id: "s1".into(),
            keyword: "cats".into(),
            user_id: "".into(),
        };
        sink.persist(&record).await.unwrap();

        assert_eq!(sink.recent(10).await.unwrap(), vec![record]);
    }
}
