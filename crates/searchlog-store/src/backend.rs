use async_trait::async_trait;
use searchlog_core::{ActivityRecord, SearchlogResult};

/// Key-value cache mapping a session id to its latest encoded entry.
///
/// Values are opaque bytes; decoding is the caller's business so that a
/// malformed value can be detected and reclaimed. There is no expiry here:
/// whether an entry is live is decided by the [`ActivityIndex`].
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Unconditionally overwrite the entry for `session_id`.
    async fn put(&self, session_id: &str, payload: Vec<u8>) -> SearchlogResult<()>;

    /// Fetch the entry for `session_id`, `None` if absent.
    async fn get(&self, session_id: &str) -> SearchlogResult<Option<Vec<u8>>>;

    /// Delete the entry for `session_id`. Deleting an absent entry is not an error.
    async fn delete(&self, session_id: &str) -> SearchlogResult<()>;

    /// Number of cached entries.
    async fn entry_count(&self) -> SearchlogResult<usize>;
}

/// Time-ordered index of session id → last-update timestamp.
#[async_trait]
pub trait ActivityIndex: Send + Sync {
    /// Upsert the score for `session_id`. A prior score is replaced, never duplicated.
    async fn record(&self, session_id: &str, updated_at: i64) -> SearchlogResult<()>;

    /// All sessions whose score is `<= cutoff`, each with the score that was read.
    /// Result order is unspecified.
    async fn range_up_to(&self, cutoff: i64) -> SearchlogResult<Vec<ActivityRecord>>;

    /// Current score for `session_id`.
    async fn score(&self, session_id: &str) -> SearchlogResult<Option<i64>>;

    /// Drop the record for `session_id`. Removing an absent record is not an error.
    async fn remove(&self, session_id: &str) -> SearchlogResult<()>;

    /// Number of tracked sessions.
    async fn tracked_count(&self) -> SearchlogResult<usize>;
}

/// A store that holds both the entry cache and the activity index and can
/// update them together.
///
/// The ingest path and the flusher only use the two compound operations for
/// writes, so an entry and its index record always appear and disappear as
/// a pair.
#[async_trait]
pub trait DebounceBackend: EntryStore + ActivityIndex {
    /// Write the entry and its index record in one atomic step.
    async fn put_tracked(
        &self,
        session_id: &str,
        payload: Vec<u8>,
        updated_at: i64,
    ) -> SearchlogResult<()>;

    /// Delete both the entry and the index record for `session_id`, but only
    /// if the entry still equals `expected` (`None`: still absent) and the index
    /// still holds `updated_at`. Returns `true` when something was released.
    async fn release_if_unchanged(
        &self,
        session_id: &str,
        expected: Option<&[u8]>,
        updated_at: i64,
    ) -> SearchlogResult<bool>;
}
