//! Tag resolution against the resident store
//!
//! Wraps the document store with a bounded retry budget and turns a
//! lookup into a [`Verdict`] (access channels) or an
//! [`EnrollmentOutcome`] (enroll channels). The store is expected to
//! fail transiently rather than stay degraded, so retries re-attempt
//! immediately with no backoff delay. Store failures never escape this
//! module as errors; they become the Error decision so the dispatcher
//! always has exactly one response to send.

use crate::error::{Error, Result};
use crate::store::{self, SharedStore};
use gatehouse_common::{
    decide, decide_enrollment, ChannelKind, EnrollmentOutcome, ResidentRecord, Tag, Verdict,
};
use serde_json::Value;

/// Store-backed tag resolver shared by every channel
pub struct Resolver {
    store: SharedStore,
    /// Retries after the initial attempt; a lookup makes at most
    /// `store_retries + 1` attempts
    store_retries: u32,
}

impl Resolver {
    pub fn new(store: SharedStore, store_retries: u32) -> Self {
        Self {
            store,
            store_retries,
        }
    }

    /// Resolve one access scan to a verdict
    ///
    /// Never fails: an exhausted retry budget produces the Error
    /// decision with the store detail as its reason.
    pub async fn resolve(&self, kind: ChannelKind, tag: &Tag) -> Verdict {
        match self.get_with_retry(store::RESIDENTS, tag.as_str()).await {
            Ok(lookup) => decide(kind, lookup.map(ResidentRecord::from_document).as_ref()),
            Err(e) => {
                tracing::error!(tag = %tag, "Resident lookup exhausted retries: {}", e);
                Verdict::store_error(e.to_string())
            }
        }
    }

    /// Run one enrollment scan: read the record, create it if absent
    pub async fn enroll(&self, tag: &Tag) -> EnrollmentOutcome {
        let existing = match self.get_with_retry(store::RESIDENTS, tag.as_str()).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!(tag = %tag, "Enrollment lookup exhausted retries: {}", e);
                return EnrollmentOutcome::Error;
            }
        };

        match existing {
            Some(doc) => decide_enrollment(ResidentRecord::from_document(doc).assigned_state()),
            None => {
                let record = ResidentRecord::new_unassigned();
                match self
                    .put_with_retry(store::RESIDENTS, tag.as_str(), record.document())
                    .await
                {
                    Ok(()) => EnrollmentOutcome::Created,
                    Err(e) => {
                        tracing::error!(tag = %tag, "Enrollment create exhausted retries: {}", e);
                        EnrollmentOutcome::Error
                    }
                }
            }
        }
    }

    async fn get_with_retry(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        let mut last_error = Error::Store(format!("no attempt made for {}/{}", collection, key));
        for attempt in 1..=self.store_retries.saturating_add(1) {
            match self.store.get(collection, key).await {
                Ok(doc) => return Ok(doc),
                Err(e) => {
                    tracing::warn!(
                        collection = %collection,
                        key = %key,
                        attempt,
                        "Store read failed: {}",
                        e
                    );
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    async fn put_with_retry(&self, collection: &str, key: &str, value: &Value) -> Result<()> {
        let mut last_error = Error::Store(format!("no attempt made for {}/{}", collection, key));
        for attempt in 1..=self.store_retries.saturating_add(1) {
            match self.store.put(collection, key, value).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        collection = %collection,
                        key = %key,
                        attempt,
                        "Store write failed: {}",
                        e
                    );
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}
