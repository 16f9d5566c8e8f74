//! Core types and error definitions for Searchlog.
//!
//! This crate holds what every other Searchlog crate shares: the error type,
//! the cached entry format, and the clock abstraction.
//!
//! # Main types
//!
//! - [`SearchlogError`]: Unified error enum for all Searchlog subsystems.
//! - [`SearchlogResult`]: Convenience alias for `Result<T, SearchlogError>`.
//! - [`DebounceEntry`]: The latest coalesced search for a session.
//! - [`ActivityRecord`]: A session id paired with its last-update score.
//! - [`SearchRecord`]: The row persisted to a sink.
//! - [`Clock`]: Source of unix-second timestamps.

/// Clock abstraction with system and manual implementations.
pub mod clock;
/// Debounce entries and sink records.
pub mod entry;
/// Error type and result alias.
pub mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{ActivityRecord, DebounceEntry, SearchRecord};
pub use error::{SearchlogError, SearchlogResult};
