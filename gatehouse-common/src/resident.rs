//! Resident record interpretation
//!
//! Resident records live in the external document store as opaque JSON
//! documents keyed by tag. The core interprets exactly one field:
//! `assigned`. Everything else (names, unit numbers, notes) passes
//! through untouched for the dashboard's benefit.

use chrono::Utc;
use serde_json::{json, Value};

/// State of a resident record's `assigned` field
///
/// Non-boolean values keep the original system's truthiness: a nonzero
/// number, non-empty string, array, or object counts as assigned; JSON
/// `null` counts the same as an absent field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignedState {
    /// `assigned` is present and truthy; the tag is bound to a resident
    Assigned,
    /// `assigned` is present and falsy; the tag is enrolled but unbound
    Unassigned,
    /// The record carries no usable `assigned` field
    Missing,
}

/// A resident record fetched from (or destined for) the document store
#[derive(Debug, Clone, PartialEq)]
pub struct ResidentRecord {
    doc: Value,
}

impl ResidentRecord {
    /// Wrap a document fetched from the store
    pub fn from_document(doc: Value) -> Self {
        Self { doc }
    }

    /// Fresh record for a first enrollment scan: unassigned, stamped
    /// with the enrollment time for the dashboard
    pub fn new_unassigned() -> Self {
        Self {
            doc: json!({
                "assigned": false,
                "enrolled_at": Utc::now().to_rfc3339(),
            }),
        }
    }

    /// The underlying store document
    pub fn document(&self) -> &Value {
        &self.doc
    }

    /// Interpret the `assigned` field
    pub fn assigned_state(&self) -> AssignedState {
        match self.doc.get("assigned") {
            None | Some(Value::Null) => AssignedState::Missing,
            Some(Value::Bool(true)) => AssignedState::Assigned,
            Some(Value::Bool(false)) => AssignedState::Unassigned,
            Some(Value::Number(n)) => {
                if n.as_f64().unwrap_or(0.0) != 0.0 {
                    AssignedState::Assigned
                } else {
                    AssignedState::Unassigned
                }
            }
            Some(Value::String(s)) => {
                if s.is_empty() {
                    AssignedState::Unassigned
                } else {
                    AssignedState::Assigned
                }
            }
            Some(Value::Array(_)) | Some(Value::Object(_)) => AssignedState::Assigned,
        }
    }
}
