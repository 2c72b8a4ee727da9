//! Shared daemon state
//!
//! One instance per process, shared as `Arc<SharedState>` by the
//! channel tasks, the liveness pulse, and the status API. Counters are
//! lock-free atomics; the event stream is a broadcast channel that SSE
//! subscribers tap into.

use crate::channel::Channel;
use gatehouse_common::{Decision, EnrollmentOutcome, GateEvent, Verdict};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

/// Shared state accessible by all components
pub struct SharedState {
    /// Registered channels, in config order (offline ones included)
    channels: Vec<Arc<Channel>>,

    /// Event broadcaster for SSE events
    pub event_tx: broadcast::Sender<GateEvent>,

    /// Process start, for /status uptime
    started_at: Instant,

    /// Scans that completed the decision pipeline
    pub scans_decided: AtomicU64,
    /// Decided scans that were accepted
    pub scans_accepted: AtomicU64,
    /// Decided scans denied by the decision table
    pub scans_denied: AtomicU64,
    /// Decided scans that ended in the Error decision
    pub scans_errored: AtomicU64,
    /// Lines that were neither a tag nor a liveness echo
    pub invalid_payloads: AtomicU64,
    /// Scans dropped by the cooldown gate (queued-dup or cooling)
    pub cooldown_rejects: AtomicU64,
    /// Resident records created by the enrollment pipeline
    pub tags_enrolled: AtomicU64,
    /// Liveness pulses successfully written
    pub heartbeats_sent: AtomicU64,
}

impl SharedState {
    /// Create shared state over the registered channels
    pub fn new(channels: Vec<Arc<Channel>>) -> Self {
        let (event_tx, _) = broadcast::channel(100); // Buffer up to 100 events
        Self {
            channels,
            event_tx,
            started_at: Instant::now(),
            scans_decided: AtomicU64::new(0),
            scans_accepted: AtomicU64::new(0),
            scans_denied: AtomicU64::new(0),
            scans_errored: AtomicU64::new(0),
            invalid_payloads: AtomicU64::new(0),
            cooldown_rejects: AtomicU64::new(0),
            tags_enrolled: AtomicU64::new(0),
            heartbeats_sent: AtomicU64::new(0),
        }
    }

    /// Broadcast an event to all SSE listeners
    pub fn broadcast_event(&self, event: GateEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to the event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<GateEvent> {
        self.event_tx.subscribe()
    }

    pub fn channels(&self) -> &[Arc<Channel>] {
        &self.channels
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Bump the decision counters for one decided scan
    pub fn note_verdict(&self, verdict: &Verdict) {
        self.scans_decided.fetch_add(1, Ordering::Relaxed);
        match verdict.decision {
            Decision::Accepted => self.scans_accepted.fetch_add(1, Ordering::Relaxed),
            Decision::Error => self.scans_errored.fetch_add(1, Ordering::Relaxed),
            _ => self.scans_denied.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Bump the enrollment counter for a newly created record
    pub fn note_enrollment(&self, outcome: EnrollmentOutcome) {
        if outcome == EnrollmentOutcome::Created {
            self.tags_enrolled.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_common::Tag;

    #[test]
    fn test_verdict_counters_classify_outcomes() {
        let state = SharedState::new(Vec::new());

        state.note_verdict(&Verdict {
            decision: Decision::Accepted,
            reason: "resident found, Entry granted".to_string(),
        });
        state.note_verdict(&Verdict {
            decision: Decision::DeniedUnknown,
            reason: "tag not found in resident store".to_string(),
        });
        state.note_verdict(&Verdict::store_error("connection reset"));

        assert_eq!(state.scans_decided.load(Ordering::Relaxed), 3);
        assert_eq!(state.scans_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(state.scans_denied.load(Ordering::Relaxed), 1);
        assert_eq!(state.scans_errored.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_enrollment_counter_counts_created_only() {
        let state = SharedState::new(Vec::new());

        state.note_enrollment(EnrollmentOutcome::Created);
        state.note_enrollment(EnrollmentOutcome::NotAssigned);
        state.note_enrollment(EnrollmentOutcome::AlreadyAssigned);

        assert_eq!(state.tags_enrolled.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers_is_harmless() {
        let state = SharedState::new(Vec::new());
        state.broadcast_event(GateEvent::ChannelOnline {
            channel: "Vehicle Entry".to_string(),
            timestamp: chrono::Utc::now(),
        });
    }

    #[tokio::test]
    async fn test_subscribers_receive_broadcast_events() {
        let state = SharedState::new(Vec::new());
        let mut rx = state.subscribe_events();

        state.broadcast_event(GateEvent::TagEnrolled {
            channel: "Assign".to_string(),
            tag: Tag::parse("00000000").unwrap(),
            outcome: EnrollmentOutcome::Created,
            response: "New Resident Created".to_string(),
            timestamp: chrono::Utc::now(),
        });

        match rx.recv().await.unwrap() {
            GateEvent::TagEnrolled { channel, .. } => assert_eq!(channel, "Assign"),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
