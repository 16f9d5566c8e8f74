#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use parking_lot::Mutex;
use searchlog_core::{ActivityRecord, ManualClock, SearchRecord, SearchlogError, SearchlogResult};
use searchlog_debounce::{Flusher, SearchLogger};
use searchlog_store::{ActivityIndex, DebounceBackend, EntryStore, MemoryBackend, PersistentSink};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ScriptedSink: records, fails on demand, optionally slow
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ScriptedSink {
    records: Mutex<Vec<SearchRecord>>,
    failing: Mutex<HashSet<String>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
}

impl ScriptedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn fail_for(&self, session_id: &str) {
        self.failing.lock().insert(session_id.to_string());
    }

    pub fn recover(&self, session_id: &str) {
        self.failing.lock().remove(session_id);
    }

    pub fn records(&self) -> Vec<SearchRecord> {
        self.records.lock().clone()
    }

    pub fn keywords_for(&self, session_id: &str) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.session_id == session_id)
            .map(|r| r.keyword.clone())
            .collect()
    }
}

#[async_trait]
impl PersistentSink for ScriptedSink {
    async fn persist(&self, record: &SearchRecord) -> SearchlogResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failed = self.failing.lock().contains(&record.session_id);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if failed {
            return Err(SearchlogError::sink("sink unavailable"));
        }
        self.records.lock().push(record.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FaultyBackend: MemoryBackend with injectable faults
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FaultyBackend {
    pub inner: MemoryBackend,
    pub fail_writes: AtomicBool,
    pub failing_scans: AtomicUsize,
    /// Range queries attempted, one per flush cycle.
    pub scans: AtomicUsize,
    /// Applied once, right after the next range query returns.
    pub rewrite_after_scan: Mutex<Option<(String, Vec<u8>, i64)>>,
}

#[async_trait]
impl EntryStore for FaultyBackend {
    async fn put(&self, session_id: &str, payload: Vec<u8>) -> SearchlogResult<()> {
        self.inner.put(session_id, payload).await
    }

    async fn get(&self, session_id: &str) -> SearchlogResult<Option<Vec<u8>>> {
        self.inner.get(session_id).await
    }

    async fn delete(&self, session_id: &str) -> SearchlogResult<()> {
        self.inner.delete(session_id).await
    }

    async fn entry_count(&self) -> SearchlogResult<usize> {
        self.inner.entry_count().await
    }
}

#[async_trait]
impl ActivityIndex for FaultyBackend {
    async fn record(&self, session_id: &str, updated_at: i64) -> SearchlogResult<()> {
        self.inner.record(session_id, updated_at).await
    }

    async fn range_up_to(&self, cutoff: i64) -> SearchlogResult<Vec<ActivityRecord>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        if self
            .failing_scans
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(SearchlogError::store("scan unavailable"));
        }
        let records = self.inner.range_up_to(cutoff).await?;
        let rewrite = self.rewrite_after_scan.lock().take();
        if let Some((session_id, payload, updated_at)) = rewrite {
            self.inner.put_tracked(&session_id, payload, updated_at).await?;
        }
        Ok(records)
    }

    async fn score(&self, session_id: &str) -> SearchlogResult<Option<i64>> {
        self.inner.score(session_id).await
    }

    async fn remove(&self, session_id: &str) -> SearchlogResult<()> {
        self.inner.remove(session_id).await
    }

    async fn tracked_count(&self) -> SearchlogResult<usize> {
        self.inner.tracked_count().await
    }
}

#[async_trait]
impl DebounceBackend for FaultyBackend {
    async fn put_tracked(
        &self,
        session_id: &str,
        payload: Vec<u8>,
        updated_at: i64,
    ) -> SearchlogResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SearchlogError::store("write refused"));
        }
        self.inner.put_tracked(session_id, payload, updated_at).await
    }

    async fn release_if_unchanged(
        &self,
        session_id: &str,
        expected: Option<&[u8]>,
        updated_at: i64,
    ) -> SearchlogResult<bool> {
        self.inner
            .release_if_unchanged(session_id, expected, updated_at)
            .await
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub backend: Arc<FaultyBackend>,
    pub sink: Arc<ScriptedSink>,
    pub logger: Arc<SearchLogger>,
    pub flusher: Arc<Flusher>,
}

impl Harness {
    pub fn new(window_secs: u64) -> Self {
        Self::with_sink(window_secs, ScriptedSink::new())
    }

    pub fn with_sink(window_secs: u64, sink: ScriptedSink) -> Self {
        let clock = Arc::new(ManualClock::new(0));
        let backend = Arc::new(FaultyBackend::default());
        let sink = Arc::new(sink);
        let logger = Arc::new(SearchLogger::new(backend.clone(), clock.clone()));
        let flusher = Arc::new(Flusher::new(
            backend.clone(),
            sink.clone(),
            clock.clone(),
            Duration::from_secs(window_secs),
        ));
        Self {
            clock,
            backend,
            sink,
            logger,
            flusher,
        }
    }

    /// Save at an absolute time.
    pub async fn save_at(&self, t: i64, keyword: &str, session_id: &str, user_id: &str) {
        self.clock.set(t);
        self.logger
            .save_search(keyword, session_id, user_id)
            .await
            .expect("save_search");
    }
}
