use crate::error::{SearchlogError, SearchlogResult};
use serde::{Deserialize, Serialize};

/// The latest coalesced search for one session.
///
/// Stored in the entry cache as JSON bytes, keyed by session id. The session
/// id itself is not part of the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceEntry {
    /// Search text of the latest event.
    pub keyword: String,
    /// User that issued it, empty when unknown.
    pub user_id: String,
    /// Unix seconds of the event that produced this value.
    pub updated_at: i64,
}

impl DebounceEntry {
    /// Entry for an event observed at `updated_at`.
    pub fn new(keyword: impl Into<String>, user_id: impl Into<String>, updated_at: i64) -> Self {
        Self {
            keyword: keyword.into(),
            user_id: user_id.into(),
            updated_at,
        }
    }

    /// Encode to the byte form kept in the entry cache.
    pub fn encode(&self) -> SearchlogResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a cached payload. Any failure is reported as
    /// [`SearchlogError::CorruptEntry`] for `session_id`.
    pub fn decode(session_id: &str, payload: &[u8]) -> SearchlogResult<Self> {
        serde_json::from_slice(payload).map_err(|e| SearchlogError::CorruptEntry {
            session_id: session_id.to_string(),
            reason: e.to_string(),
        })
    }

    /// Build the record handed to a sink.
    pub fn to_record(&self, session_id: &str) -> SearchRecord {
        SearchRecord {
            session_id: session_id.to_string(),
            keyword: self.keyword.clone(),
            user_id: self.user_id.clone(),
        }
    }
}

/// One row in the activity index: a session and the score it was tracked with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActivityRecord {
    /// Tracked session.
    pub session_id: String,
    /// Score read from the index, in unix seconds.
    pub updated_at: i64,
}

impl ActivityRecord {
    /// Pair a session with a score.
    pub fn new(session_id: impl Into<String>, updated_at: i64) -> Self {
        Self {
            session_id: session_id.into(),
            updated_at,
        }
    }
}

/// The final coalesced search persisted to a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
    /// Session the search was coalesced under.
    pub session_id: String,
    /// Final keyword of the session.
    pub keyword: String,
    /// User that issued it.
    pub user_id: String,
}
