//! HTTP ingest boundary for Searchlog.
//!
//! Exposes `POST /log`, which hands each search event to a
//! [`SearchLogger`](searchlog_debounce::SearchLogger), and `GET /health`.

/// `POST /log` request handling.
pub mod handler;
/// Router construction and `GET /health`.
pub mod server;

pub use handler::SearchPayload;
pub use server::{AppState, GatewayServer};
