//! # Gatehouse Access Controller (gatehouse-ac)
//!
//! Bridges RFID reader channels to the cloud resident store and decides
//! who gets through the gate.
//!
//! **Purpose:** ingest raw tag reads from independent reader channels,
//! deduplicate and rate-limit them, resolve each tag against resident
//! state with bounded retries, derive an outcome, write an audit trail,
//! and answer the originating channel exactly once per admitted scan.
//!
//! **Architecture:** one intake/drain task pair per channel over a
//! transport-agnostic byte stream, a shared retrying document-store
//! client, and an axum HTTP/SSE surface for the dashboard.

pub mod api;
pub mod audit;
pub mod channel;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod resolver;
pub mod state;
pub mod store;

pub use error::{Error, Result};
pub use state::SharedState;
