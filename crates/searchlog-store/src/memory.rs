use crate::backend::{ActivityIndex, DebounceBackend, EntryStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use searchlog_core::{ActivityRecord, SearchlogResult};
use std::collections::{BTreeSet, HashMap};

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Vec<u8>>,
    scores: HashMap<String, i64>,
    by_time: BTreeSet<(i64, String)>,
}

impl Inner {
    fn record(&mut self, session_id: &str, updated_at: i64) {
        if let Some(old) = self.scores.insert(session_id.to_string(), updated_at) {
            self.by_time.remove(&(old, session_id.to_string()));
        }
        self.by_time.insert((updated_at, session_id.to_string()));
    }

    fn remove(&mut self, session_id: &str) {
        if let Some(old) = self.scores.remove(session_id) {
            self.by_time.remove(&(old, session_id.to_string()));
        }
    }
}

/// In-process backend. One mutex guards the entries and the index, so
/// compound operations are atomic.
///
/// State is lost on restart; use the SQLite backend when a separate flush
/// worker needs to see it.
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    /// An empty backend.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntryStore for MemoryBackend {
    async fn put(&self, session_id: &str, payload: Vec<u8>) -> SearchlogResult<()> {
        self.inner
            .lock()
            .entries
            .insert(session_id.to_string(), payload);
        Ok(())
    }

    async fn get(&self, session_id: &str) -> SearchlogResult<Option<Vec<u8>>> {
        Ok(self.inner.lock().entries.get(session_id).cloned())
    }

    async fn delete(&self, session_id: &str) -> SearchlogResult<()> {
        self.inner.lock().entries.remove(session_id);
        Ok(())
    }

    async fn entry_count(&self) -> SearchlogResult<usize> {
        Ok(self.inner.lock().entries.len())
    }
}

#[async_trait]
impl ActivityIndex for MemoryBackend {
    async fn record(&self, session_id: &str, updated_at: i64) -> SearchlogResult<()> {
        self.inner.lock().record(session_id, updated_at);
        Ok(())
    }

    async fn range_up_to(&self, cutoff: i64) -> SearchlogResult<Vec<ActivityRecord>> {
        let inner = self.inner.lock();
        Ok(inner
            .by_time
            .iter()
            .take_while(|(score, _)| *score <= cutoff)
            .map(|(score, id)| ActivityRecord::new(id.clone(), *score))
            .collect())
    }

    async fn score(&self, session_id: &str) -> SearchlogResult<Option<i64>> {
        Ok(self.inner.lock().scores.get(session_id).copied())
    }

    async fn remove(&self, session_id: &str) -> SearchlogResult<()> {
        self.inner.lock().remove(session_id);
        Ok(())
    }

    async fn tracked_count(&self) -> SearchlogResult<usize> {
        Ok(self.inner.lock().scores.len())
    }
}

#[async_trait]
impl DebounceBackend for MemoryBackend {
    async fn put_tracked(
        &self,
        session_id: &str,
        payload: Vec<u8>,
        updated_at: i64,
    ) -> SearchlogResult<()> {
        let mut inner = self.inner.lock();
        inner.entries.insert(session_id.to_string(), payload);
        inner.record(session_id, updated_at);
        Ok(())
    }

    async fn release_if_unchanged(
        &self,
        session_id: &str,
        expected: Option<&[u8]>,
        updated_at: i64,
    ) -> SearchlogResult<bool> {
        let mut inner = self.inner.lock();
        let entry_matches = inner.entries.get(session_id).map(Vec::as_slice) == expected;
        let score_matches = inner.scores.get(session_id) == Some(&updated_at);
        if !(entry_matches && score_matches) {
            return Ok(false);
        }
        inner.entries.remove(session_id);
        inner.remove(session_id);
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_replaces_prior_score() {
        let backend = MemoryBackend::new();
        backend.record("s1", 10).await.unwrap();
        backend.record("s1", 20).await.unwrap();

        assert_eq!(backend.tracked_count().await.unwrap(), 1);
        assert_eq!(backend.score("s1").await.unwrap(), Some(20));
        assert!(backend.range_up_to(15).await.unwrap().is_empty());
        assert_eq!(
            backend.range_up_to(20).await.unwrap(),
            vec![ActivityRecord::new("s1", 20)]
        );
    }

    #[tokio::test]
    async fn range_is_inclusive_of_cutoff() {
        let backend = MemoryBackend::new();
        backend.record("a", 1).await.unwrap();
        backend.record("b", 2).await.unwrap();
        backend.record("c", 3).await.unwrap();

        let mut ids: Vec<String> = backend
            .range_up_to(2)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.session_id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn release_requires_matching_payload_and_score() {
        let backend = MemoryBackend::new();
        backend.put_tracked("s1", b"v1".to_vec(), 5).await.unwrap();

        assert!(!backend.release_if_unchanged("s1", Some(b"v0".as_slice()), 5).await.unwrap());
        assert!(!backend.release_if_unchanged("s1", Some(b"v1".as_slice()), 4).await.unwrap());
        assert!(!backend.release_if_unchanged("s1", None, 5).await.unwrap());
        assert_eq!(backend.entry_count().await.unwrap(), 1);

        assert!(backend.release_if_unchanged("s1", Some(b"v1".as_slice()), 5).await.unwrap());
        assert_eq!(backend.entry_count().await.unwrap(), 0);
        assert_eq!(backend.tracked_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn release_orphaned_index_record() {
        let backend = MemoryBackend::new();
        backend.record("ghost", 3).await.unwrap();

        assert!(backend.release_if_unchanged("ghost", None, 3).await.unwrap());
        assert_eq!(backend.score("ghost").await.unwrap(), None);
    }
}
