//! Event types for the Gatehouse event stream
//!
//! Events are broadcast by the access controller and consumed over SSE
//! by the dashboard. Serialized with a `type` tag for exhaustive
//! client-side matching.

use crate::channel::ChannelKind;
use crate::decision::{Decision, EnrollmentOutcome};
use crate::tag::Tag;
use serde::{Deserialize, Serialize};

/// Gatehouse event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GateEvent {
    /// An access scan completed the full decision pipeline
    ScanDecided {
        /// Channel name, e.g. "Vehicle Entry"
        channel: String,
        /// Channel direction
        kind: ChannelKind,
        /// Normalized tag
        tag: Tag,
        /// Outcome of the decision table
        decision: Decision,
        /// Human-readable reason recorded in the audit trail
        reason: String,
        /// Response text written to the reader
        response: String,
        /// When the decision was made
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An enrollment scan completed
    TagEnrolled {
        /// Channel name, e.g. "Assign"
        channel: String,
        /// Normalized tag
        tag: Tag,
        /// Enrollment outcome
        outcome: EnrollmentOutcome,
        /// Response text written to the reader
        response: String,
        /// When the enrollment completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A channel's transport came up at startup
    ChannelOnline {
        /// Channel name
        channel: String,
        /// When the channel came online
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A channel's transport reached EOF or failed; the channel is out
    /// of service until the process restarts
    ChannelOffline {
        /// Channel name
        channel: String,
        /// Why the channel went offline
        reason: String,
        /// When the channel went offline
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl GateEvent {
    /// Event type string used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            GateEvent::ScanDecided { .. } => "ScanDecided",
            GateEvent::TagEnrolled { .. } => "TagEnrolled",
            GateEvent::ChannelOnline { .. } => "ChannelOnline",
            GateEvent::ChannelOffline { .. } => "ChannelOffline",
        }
    }
}
