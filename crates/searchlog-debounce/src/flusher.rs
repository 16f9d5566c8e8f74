use searchlog_core::{
    ActivityRecord, Clock, DebounceEntry, SearchRecord, SearchlogError, SearchlogResult,
};
use searchlog_store::{ActivityIndex, DebounceBackend, EntryStore, PersistentSink};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// What happened to one candidate during a flush cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Persisted to the sink; entry and index record released.
    Flushed(SearchRecord),
    /// Tracked but no entry found; tracking dropped.
    Missing,
    /// Entry could not be decoded; entry and tracking dropped.
    Corrupt,
    /// Entry was rewritten after the scan; left for a later cycle.
    Superseded,
    /// Sink or store call failed; state untouched, retried next cycle.
    Failed,
}

/// Tally of one flush cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Candidates returned by the range query.
    pub scanned: usize,
    /// Records handed to the sink, in processing order.
    pub flushed: Vec<SearchRecord>,
    /// Tracked sessions with no entry.
    pub missing: usize,
    /// Entries that failed to decode and were discarded.
    pub corrupt: usize,
    /// Sessions rewritten after the scan, left for a later cycle.
    pub superseded: usize,
    /// Sink or store failures, retried next cycle.
    pub failed: usize,
}

impl FlushReport {
    fn tally(&mut self, outcome: FlushOutcome) {
        match outcome {
            FlushOutcome::Flushed(record) => self.flushed.push(record),
            FlushOutcome::Missing => self.missing += 1,
            FlushOutcome::Corrupt => self.corrupt += 1,
            FlushOutcome::Superseded => self.superseded += 1,
            FlushOutcome::Failed => self.failed += 1,
        }
    }

    /// True when the cycle found nothing to do.
    pub fn is_idle(&self) -> bool {
        self.scanned == 0
    }
}

/// One flush cycle: find sessions quiet for longer than the window, persist
/// their final entry, release them.
///
/// Candidates are handled one by one and independently. Cleanup only happens
/// after the sink accepted the record, and only if the session was not
/// rewritten in the meantime.
pub struct Flusher {
    backend: Arc<dyn DebounceBackend>,
    sink: Arc<dyn PersistentSink>,
    clock: Arc<dyn Clock>,
    window_secs: i64,
}

impl Flusher {
    /// `window` is rounded up to whole seconds.
    pub fn new(
        backend: Arc<dyn DebounceBackend>,
        sink: Arc<dyn PersistentSink>,
        clock: Arc<dyn Clock>,
        window: Duration,
    ) -> Self {
        let whole = window.as_secs() + u64::from(window.subsec_nanos() > 0);
        Self {
            backend,
            sink,
            clock,
            window_secs: i64::try_from(whole).unwrap_or(i64::MAX),
        }
    }

    /// `now - window`. Sessions last updated strictly before this are eligible.
    pub fn cutoff(&self) -> i64 {
        self.clock.now().saturating_sub(self.window_secs)
    }

    /// Run one cycle. Only a failed range query fails the whole cycle;
    /// per-session problems are logged and counted in the report.
    pub async fn flush_once(&self) -> SearchlogResult<FlushReport> {
        let cutoff = self.cutoff();
        // Scores are whole seconds, so "strictly before cutoff" is "<= cutoff - 1".
        let candidates = self.backend.range_up_to(cutoff.saturating_sub(1)).await?;

        let mut report = FlushReport {
            scanned: candidates.len(),
            ..FlushReport::default()
        };

        for candidate in &candidates {
            match self.flush_session(candidate).await {
                Ok(outcome) => report.tally(outcome),
                Err(e) => {
                    error!(
                        session_id = %candidate.session_id,
                        error = %e,
                        "Store error while flushing session, will retry"
                    );
                    report.tally(FlushOutcome::Failed);
                }
            }
        }

        if report.is_idle() {
            debug!(cutoff, "Flush cycle: nothing eligible");
        } else {
            info!(
                cutoff,
                scanned = report.scanned,
                flushed = report.flushed.len(),
                missing = report.missing,
                corrupt = report.corrupt,
                superseded = report.superseded,
                failed = report.failed,
                "Flush cycle complete"
            );
        }
        Ok(report)
    }

    async fn flush_session(&self, candidate: &ActivityRecord) -> SearchlogResult<FlushOutcome> {
        let session_id = candidate.session_id.as_str();

        let Some(payload) = self.backend.get(session_id).await? else {
            let err = SearchlogError::MissingEntry {
                session_id: session_id.to_string(),
            };
            warn!(session_id = %session_id, error = %err, "Dropping tracking for missing entry");
            self.backend
                .release_if_unchanged(session_id, None, candidate.updated_at)
                .await?;
            return Ok(FlushOutcome::Missing);
        };

        let entry = match DebounceEntry::decode(session_id, &payload) {
            Ok(entry) => entry,
            Err(err) => {
                error!(
                    session_id = %session_id,
                    error = %err,
                    payload = %String::from_utf8_lossy(&payload),
                    "Discarding corrupt entry"
                );
                self.backend
                    .release_if_unchanged(session_id, Some(payload.as_slice()), candidate.updated_at)
                    .await?;
                return Ok(FlushOutcome::Corrupt);
            }
        };

        if entry.updated_at > candidate.updated_at {
            debug!(
                session_id = %session_id,
                scanned_at = candidate.updated_at,
                updated_at = entry.updated_at,
                "Session updated after scan, skipping"
            );
            return Ok(FlushOutcome::Superseded);
        }

        let record = entry.to_record(session_id);
        if let Err(err) = self.sink.persist(&record).await {
            error!(session_id = %session_id, error = %err, "Persist failed, session stays pending");
            return Ok(FlushOutcome::Failed);
        }

        info!(session_id = %session_id, keyword = %record.keyword, "Flushed search");

        match self
            .backend
            .release_if_unchanged(session_id, Some(payload.as_slice()), candidate.updated_at)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!(session_id = %session_id, "Session rewritten during flush, keeping newer entry");
            }
            Err(e) => {
                error!(
                    session_id = %session_id,
                    error = %e,
                    "Flushed but cleanup failed, session may be persisted again"
                );
            }
        }
        Ok(FlushOutcome::Flushed(record))
    }
}
