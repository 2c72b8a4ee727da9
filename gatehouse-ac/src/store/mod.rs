//! Document store access
//!
//! The daemon keeps no durable state of its own; residents and audit
//! records live in an external document store addressed as
//! collection/key. `DocumentStore` is the seam between the pipeline and
//! the store implementation: production uses [`HttpDocumentStore`],
//! tests and development use [`MemoryDocumentStore`].

use crate::config::{StoreBackend, StoreConfig};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub mod http;
pub mod memory;

pub use http::HttpDocumentStore;
pub use memory::MemoryDocumentStore;

/// Resident records, keyed by tag
pub const RESIDENTS: &str = "residents";
/// Append-only log of every decided scan, keyed by `{tag}-{epoch_ms}`
pub const SCAN_LOG: &str = "scan_log";
/// Append-only log of denied and errored scans, keyed by `{tag}-{epoch_ms}`
pub const DENIED_LOG: &str = "denied_log";
/// Most recent accepted entry per tag, keyed by tag
pub const LATEST_ENTRY: &str = "latest_entry";
/// Most recent accepted exit per tag, keyed by tag
pub const LATEST_EXIT: &str = "latest_exit";

/// Key/value document access, one JSON document per key
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, `None` when the key does not exist
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>>;

    /// Create or replace a document
    async fn put(&self, collection: &str, key: &str, value: &Value) -> Result<()>;
}

/// Store handle shared across the pipeline tasks
pub type SharedStore = Arc<dyn DocumentStore>;

/// Build the configured store implementation
pub fn build_store(config: &StoreConfig) -> Result<SharedStore> {
    Ok(match config.backend {
        StoreBackend::Http => Arc::new(HttpDocumentStore::new(config)?),
        StoreBackend::Memory => Arc::new(MemoryDocumentStore::new()),
    })
}
