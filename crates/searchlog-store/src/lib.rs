//! Storage for the Searchlog debounce engine.
//!
//! - [`EntryStore`] / [`ActivityIndex`] / [`DebounceBackend`]: pending
//!   state, the latest entry per session and when it was last touched.
//! - [`PersistentSink`]: the durable side that receives flushed searches.
//!
//! The `sqlite` feature adds [`SqliteBackend`] and [`SqliteSink`].

/// Storage traits.
pub mod backend;
/// In-memory backend.
pub mod memory;
/// Sink trait and file/memory sinks.
pub mod sink;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use backend::{ActivityIndex, DebounceBackend, EntryStore};
pub use memory::MemoryBackend;
pub use sink::{JsonlLine, JsonlSink, MemorySink, PersistentSink};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteBackend, SqliteSink};
