//! Access decision engine
//!
//! Pure mapping from resolver output to an outcome, a human-readable
//! reason, and the fixed response text sent back to the reader. This
//! table is the single source of truth for response wording; nothing
//! else in the system composes reader-facing strings.

use crate::channel::ChannelKind;
use crate::resident::{AssignedState, ResidentRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Access-control outcome for one scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Tag resolved to an assigned resident; access granted
    Accepted,
    /// Tag exists in the store but is not assigned to a resident
    DeniedUnassigned,
    /// Tag has no record in the resident store
    DeniedUnknown,
    /// Resident record exists but carries no usable `assigned` field
    DeniedNoAssignedField,
    /// Store failure prevented a real decision
    Error,
}

impl Decision {
    /// Response text written back to the reader, newline-terminated by
    /// the channel writer
    pub fn response_text(&self) -> &'static str {
        match self {
            Decision::Accepted => "Resident Found",
            Decision::DeniedUnassigned => "Resident Not Found - Assign Needed",
            Decision::DeniedUnknown | Decision::DeniedNoAssignedField => "Resident Not Found",
            Decision::Error => "Error",
        }
    }

    /// True for the denied variants (not Accepted, not Error)
    pub fn is_denied(&self) -> bool {
        matches!(
            self,
            Decision::DeniedUnassigned | Decision::DeniedUnknown | Decision::DeniedNoAssignedField
        )
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Decision::Accepted => "Accepted",
            Decision::DeniedUnassigned => "DeniedUnassigned",
            Decision::DeniedUnknown => "DeniedUnknown",
            Decision::DeniedNoAssignedField => "DeniedNoAssignedField",
            Decision::Error => "Error",
        };
        f.write_str(name)
    }
}

/// Outcome plus reason for one scan on one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub decision: Decision,
    pub reason: String,
}

impl Verdict {
    /// Verdict for a store failure; the reason carries the error detail,
    /// the reader only ever sees the generic "Error" response
    pub fn store_error(detail: impl Into<String>) -> Self {
        Verdict {
            decision: Decision::Error,
            reason: detail.into(),
        }
    }
}

/// Map a resolver lookup to a decision
///
/// `lookup` is `None` when the store has no record for the tag. The
/// wording of the accepted reason keys off the channel direction.
pub fn decide(kind: ChannelKind, lookup: Option<&ResidentRecord>) -> Verdict {
    match lookup {
        None => Verdict {
            decision: Decision::DeniedUnknown,
            reason: "tag not found in resident store".to_string(),
        },
        Some(record) => match record.assigned_state() {
            AssignedState::Unassigned => Verdict {
                decision: Decision::DeniedUnassigned,
                reason: "tag exists but is not assigned to a resident".to_string(),
            },
            AssignedState::Missing => Verdict {
                decision: Decision::DeniedNoAssignedField,
                reason: "resident record missing assigned field".to_string(),
            },
            AssignedState::Assigned => Verdict {
                decision: Decision::Accepted,
                reason: format!("resident found, {} granted", kind.direction_label()),
            },
        },
    }
}

/// Outcome of an enrollment scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrollmentOutcome {
    /// No record existed; one was created with `assigned = false`
    Created,
    /// Record exists but the tag is not yet assigned to a resident
    NotAssigned,
    /// Record exists and the tag is assigned
    AlreadyAssigned,
    /// Store failure prevented enrollment
    Error,
}

impl EnrollmentOutcome {
    /// Response text written back to the enrollment reader
    pub fn response_text(&self) -> &'static str {
        match self {
            EnrollmentOutcome::Created => "New Resident Created",
            EnrollmentOutcome::NotAssigned => "UID Not Assigned",
            EnrollmentOutcome::AlreadyAssigned => "Resident Found",
            EnrollmentOutcome::Error => "Error",
        }
    }
}

/// Map an existing record's assigned state to an enrollment outcome
///
/// A record with a missing `assigned` field is treated as not assigned,
/// matching the original system's falsy handling. The `Created` and
/// `Error` outcomes are produced by the enrollment pipeline itself.
pub fn decide_enrollment(state: AssignedState) -> EnrollmentOutcome {
    match state {
        AssignedState::Assigned => EnrollmentOutcome::AlreadyAssigned,
        AssignedState::Unassigned | AssignedState::Missing => EnrollmentOutcome::NotAssigned,
    }
}
