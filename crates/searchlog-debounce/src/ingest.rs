use searchlog_core::{Clock, DebounceEntry, SearchlogError, SearchlogResult};
use searchlog_store::{ActivityIndex, DebounceBackend};
use std::sync::Arc;
use tracing::{debug, error};

/// Write path for incoming search events.
///
/// Every call overwrites the session's pending entry and moves its
/// last-update score to now, so only the most recent search of a burst
/// survives until the flusher picks it up.
pub struct SearchLogger {
    backend: Arc<dyn DebounceBackend>,
    clock: Arc<dyn Clock>,
}

impl SearchLogger {
    /// Logger writing to `backend`, stamping events with `clock`.
    pub fn new(backend: Arc<dyn DebounceBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    /// Record a search. Nothing is validated; `session_id` is the only dedup key.
    ///
    /// Entry and index record are written in one backend call. Any failure is
    /// reported as [`SearchlogError::WriteFailure`].
    pub async fn save_search(
        &self,
        keyword: &str,
        session_id: &str,
        user_id: &str,
    ) -> SearchlogResult<()> {
        let entry = DebounceEntry::new(keyword, user_id, self.clock.now());
        let payload = entry
            .encode()
            .map_err(|e| SearchlogError::WriteFailure(e.to_string()))?;

        if let Err(e) = self
            .backend
            .put_tracked(session_id, payload, entry.updated_at)
            .await
        {
            error!(session_id = %session_id, error = %e, "Failed to store search");
            return Err(SearchlogError::WriteFailure(e.to_string()));
        }

        debug!(
            session_id = %session_id,
            updated_at = entry.updated_at,
            "Search debounced"
        );
        Ok(())
    }

    /// Number of sessions waiting to be flushed.
    pub async fn pending(&self) -> SearchlogResult<usize> {
        self.backend.tracked_count().await
    }
}
