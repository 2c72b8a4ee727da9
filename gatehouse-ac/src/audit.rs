//! Audit trail for access decisions
//!
//! Every decided scan produces one append into the all-events scan log,
//! keyed by `{tag}-{epoch_ms}-{seq}`; the process-wide sequence breaks
//! ties when two channels decide the same tag in the same millisecond.
//! Accepted scans additionally upsert a per-direction "latest accepted"
//! pointer keyed by tag alone; denied and errored scans additionally
//! append to the denied log. The response to the reader is computed
//! before any of this runs, so audit failures are logged and swallowed
//! rather than propagated.

use crate::store::{self, SharedStore};
use chrono::{DateTime, Utc};
use gatehouse_common::{ChannelKind, Decision, Tag, Verdict};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// One decision headed for the audit trail
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub tag: Tag,
    pub channel: String,
    pub kind: ChannelKind,
    pub verdict: Verdict,
    pub timestamp: DateTime<Utc>,
    sequence: u64,
}

impl AuditRecord {
    /// Build a record stamped with the current time and the next
    /// process-wide sequence number
    pub fn new(channel: &str, kind: ChannelKind, tag: Tag, verdict: Verdict) -> Self {
        Self {
            tag,
            channel: channel.to_string(),
            kind,
            verdict,
            timestamp: Utc::now(),
            sequence: SEQUENCE.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Append-collection key: tag, scan time in epoch milliseconds, and
    /// the sequence that keeps same-millisecond decisions distinct
    pub fn log_key(&self) -> String {
        format!(
            "{}-{}-{}",
            self.tag,
            self.timestamp.timestamp_millis(),
            self.sequence
        )
    }

    /// Store document for this record
    pub fn document(&self) -> Value {
        json!({
            "tag": self.tag.as_str(),
            "channel": self.channel,
            "direction": self.kind,
            "decision": self.verdict.decision,
            "reason": self.verdict.reason,
            "at": self.timestamp.to_rfc3339(),
            "at_ms": self.timestamp.timestamp_millis(),
        })
    }
}

/// Writes audit records to the document store
pub struct AuditLogger {
    store: SharedStore,
}

impl AuditLogger {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Record one decision
    ///
    /// Writes the all-events append first, then the conditional
    /// secondary write. Each write gets a single attempt; failures are
    /// logged and swallowed so the already-sent channel response is
    /// never blocked on the audit trail.
    pub async fn record(&self, record: &AuditRecord) {
        let key = record.log_key();
        let doc = record.document();

        if let Err(e) = self.store.put(store::SCAN_LOG, &key, &doc).await {
            tracing::warn!(tag = %record.tag, key = %key, "Scan log append failed: {}", e);
        }

        if record.verdict.decision == Decision::Accepted {
            let latest = match record.kind {
                ChannelKind::Entry => Some(store::LATEST_ENTRY),
                ChannelKind::Exit => Some(store::LATEST_EXIT),
                ChannelKind::Enroll => None,
            };
            if let Some(collection) = latest {
                if let Err(e) = self.store.put(collection, record.tag.as_str(), &doc).await {
                    tracing::warn!(
                        tag = %record.tag,
                        collection = %collection,
                        "Latest-accepted upsert failed: {}",
                        e
                    );
                }
            }
        } else {
            // Denied and Error outcomes both land in the denied log
            if let Err(e) = self.store.put(store::DENIED_LOG, &key, &doc).await {
                tracing::warn!(tag = %record.tag, key = %key, "Denied log append failed: {}", e);
            }
        }
    }
}
