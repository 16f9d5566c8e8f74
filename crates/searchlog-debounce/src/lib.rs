//! The Searchlog debounce-and-flush engine.
//!
//! Search events come in through [`SearchLogger::save_search`], which keeps
//! only the latest event per session. A [`FlushScheduler`] runs the
//! [`Flusher`] on a fixed cadence; each cycle persists every session that has
//! been quiet for longer than the debounce window and then releases it.
//!
//! ```text
//! save_search ──► DebounceBackend ◄── Flusher ──► PersistentSink
//!                                        ▲
//!                                 FlushScheduler
//! ```

/// Window, interval, and tick policy.
pub mod config;
/// One flush cycle.
pub mod flusher;
/// The per-event write path.
pub mod ingest;
/// Periodic driver for the flusher.
pub mod scheduler;

pub use config::{DebounceConfig, TickPolicy};
pub use flusher::{FlushOutcome, FlushReport, Flusher};
pub use ingest::SearchLogger;
pub use scheduler::FlushScheduler;
