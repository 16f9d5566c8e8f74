use crate::config::{SearchlogConfig, SinkConfig, SinkKind, StorageBackend, StorageConfig};
use searchlog_core::{SearchlogError, SearchlogResult, SystemClock};
use searchlog_debounce::{Flusher, SearchLogger};
use searchlog_store::{
    DebounceBackend, JsonlSink, MemoryBackend, PersistentSink, SqliteBackend, SqliteSink,
};
use std::sync::Arc;
use tracing::info;

/// Everything `serve` and `flush` need, wired from one config.
pub struct Engine {
    pub logger: Arc<SearchLogger>,
    pub flusher: Arc<Flusher>,
}

impl Engine {
    pub async fn build(config: &SearchlogConfig) -> SearchlogResult<Self> {
        let clock = Arc::new(SystemClock);
        let backend = open_backend(&config.storage)?;
        let sink = open_sink(&config.sink).await?;

        let logger = Arc::new(SearchLogger::new(backend.clone(), clock.clone()));
        let flusher = Arc::new(Flusher::new(
            backend,
            sink,
            clock,
            config.debounce.window(),
        ));
        Ok(Self { logger, flusher })
    }
}

/// A standalone flush worker only sees sessions written by other processes
/// through shared storage.
pub fn require_shared_storage(storage: &StorageConfig) -> SearchlogResult<()> {
    if storage.backend == StorageBackend::Memory {
        return Err(SearchlogError::Config(
            "the flush command needs storage.backend = \"sqlite\"".into(),
        ));
    }
    Ok(())
}

pub fn open_backend(storage: &StorageConfig) -> SearchlogResult<Arc<dyn DebounceBackend>> {
    match storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory debounce storage");
            Ok(Arc::new(MemoryBackend::new()))
        }
        StorageBackend::Sqlite => {
            info!(path = %storage.path.display(), "Using SQLite debounce storage");
            Ok(Arc::new(SqliteBackend::open(&storage.path)?))
        }
    }
}

pub async fn open_sink(sink: &SinkConfig) -> SearchlogResult<Arc<dyn PersistentSink>> {
    info!(kind = ?sink.kind, path = %sink.path.display(), "Opening sink");
    match sink.kind {
        SinkKind::Sqlite => Ok(Arc::new(SqliteSink::open(&sink.path)?)),
        SinkKind::Jsonl => Ok(Arc::new(JsonlSink::new(sink.path.clone()).await?)),
    }
}
