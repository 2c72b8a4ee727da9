//! In-process document store
//!
//! Backs tests and development runs. Documents live in a map guarded by
//! a blocking mutex; no method holds the lock across an await. Failure
//! injection lets pipeline tests exercise the retry and error paths.

use crate::error::{Error, Result};
use crate::store::DocumentStore;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

struct Inner {
    /// collection name -> (key -> document), ordered keys for stable listing
    collections: HashMap<String, BTreeMap<String, Value>>,
    /// Remaining number of operations forced to fail
    fail_remaining: u32,
}

/// Memory-backed document store
pub struct MemoryDocumentStore {
    inner: Mutex<Inner>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                collections: HashMap::new(),
                fail_remaining: 0,
            }),
        }
    }

    /// Force the next `count` operations (get or put) to fail
    pub fn fail_next(&self, count: u32) {
        self.inner.lock().unwrap().fail_remaining = count;
    }

    /// Number of documents in a collection
    pub fn collection_len(&self, collection: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    /// Keys in a collection, in order
    pub fn keys(&self, collection: &str) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .collections
            .get(collection)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Direct document read, bypassing failure injection
    pub fn document(&self, collection: &str, key: &str) -> Option<Value> {
        self.inner
            .lock()
            .unwrap()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(key))
            .cloned()
    }

    /// Direct document write, bypassing failure injection
    pub fn seed(&self, collection: &str, key: &str, value: Value) {
        self.inner
            .lock()
            .unwrap()
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    fn take_injected_failure(inner: &mut Inner) -> bool {
        if inner.fail_remaining > 0 {
            inner.fail_remaining -= 1;
            true
        } else {
            false
        }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        let mut inner = self.inner.lock().unwrap();
        if Self::take_injected_failure(&mut inner) {
            return Err(Error::Store(format!(
                "injected failure: GET {}/{}",
                collection, key
            )));
        }
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(key))
            .cloned())
    }

    async fn put(&self, collection: &str, key: &str, value: &Value) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if Self::take_injected_failure(&mut inner) {
            return Err(Error::Store(format!(
                "injected failure: PUT {}/{}",
                collection, key
            )));
        }
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), value.clone());
        Ok(())
    }
}
