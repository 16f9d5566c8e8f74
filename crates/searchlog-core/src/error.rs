use thiserror::Error;

/// Convenience alias for `Result<T, SearchlogError>`.
pub type SearchlogResult<T> = Result<T, SearchlogError>;

/// Top-level error type for the Searchlog crates.
///
/// None of these are fatal to the process: the flush loop logs them and
/// keeps going, the ingest path hands them to its caller.
#[derive(Error, Debug)]
pub enum SearchlogError {
    /// The sink rejected or failed to store a record. Nothing was cleaned up,
    /// so the session is retried on the next flush cycle.
    #[error("Sink error: {0}")]
    Sink(String),

    /// A tracked session had no entry in the entry store.
    #[error("Missing debounce entry for session {session_id}")]
    MissingEntry {
        /// Session whose entry was not found.
        session_id: String,
    },

    /// An entry was present but could not be decoded.
    #[error("Corrupt debounce entry for session {session_id}: {reason}")]
    CorruptEntry {
        /// Session whose entry failed to decode.
        session_id: String,
        /// Decoder message.
        reason: String,
    },

    /// The ingest write failed. Callers get no detail about which store failed.
    #[error("Failed to store search: {0}")]
    WriteFailure(String),

    /// A backing store call failed.
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid or unreadable configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON encoding or decoding outside the entry cache.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchlogError {
    /// Shorthand for a [`SearchlogError::Store`] built from any displayable error.
    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::Store(err.to_string())
    }

    /// Shorthand for a [`SearchlogError::Sink`] built from any displayable error.
    pub fn sink(err: impl std::fmt::Display) -> Self {
        Self::Sink(err.to_string())
    }
}
