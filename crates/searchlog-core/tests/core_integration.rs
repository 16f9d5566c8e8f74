#![allow(clippy::unwrap_used, clippy::expect_used)]

use searchlog_core::*;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// 1. Entry encode/decode keeps last-write-wins fields intact
// ---------------------------------------------------------------------------

#[test]
fn entry_survives_cache_encoding() {
    let entry = DebounceEntry::new("cats and dogs", "u1", 1_700_000_001);
    let bytes = entry.encode().unwrap();
    let decoded = DebounceEntry::decode("s1", &bytes).unwrap();
    assert_eq!(decoded, entry);
}

#[test]
fn empty_fields_are_accepted() {
    let entry = DebounceEntry::new("", "", 0);
    let decoded = DebounceEntry::decode("", &entry.encode().unwrap()).unwrap();
    assert_eq!(decoded.keyword, "");
    assert_eq!(decoded.user_id, "");
}

// ---------------------------------------------------------------------------
// 2. Error display
// ---------------------------------------------------------------------------

#[test]
fn error_messages_name_the_session() {
    let missing = SearchlogError::MissingEntry {
        session_id: "s1".into(),
    };
    assert_eq!(missing.to_string(), "Missing debounce entry for session s1");

    let corrupt = DebounceEntry::decode("s2", b"\xff\xfe").unwrap_err();
    assert!(corrupt.to_string().starts_with("Corrupt debounce entry for session s2"));
}

#[test]
fn io_and_json_errors_convert() {
    let io: SearchlogError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
    assert!(matches!(io, SearchlogError::Io(_)));

    let json_err = serde_json::from_str::<DebounceEntry>("nope").unwrap_err();
    let err: SearchlogError = json_err.into();
    assert!(matches!(err, SearchlogError::Serialization(_)));
}

#[test]
fn store_and_sink_helpers() {
    assert_eq!(SearchlogError::store("locked").to_string(), "Store error: locked");
    assert_eq!(SearchlogError::sink("down").to_string(), "Sink error: down");
}

// ---------------------------------------------------------------------------
// 3. Clocks behind a trait object
// ---------------------------------------------------------------------------

#[test]
fn manual_clock_shared_through_arc() {
    let manual = Arc::new(ManualClock::new(100));
    let clock: Arc<dyn Clock> = manual.clone();
    manual.advance(3);
    assert_eq!(clock.now(), 103);
}
