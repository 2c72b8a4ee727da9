//! # Gatehouse Common Library
//!
//! Shared vocabulary for the Gatehouse access-control system:
//! - Tag parsing and scan-payload classification
//! - Channel kinds (Entry / Exit / Enroll)
//! - Resident record interpretation
//! - The access decision table and fixed response vocabulary
//! - Event types broadcast to dashboard consumers
//! - Common error types

pub mod channel;
pub mod decision;
pub mod error;
pub mod events;
pub mod resident;
pub mod tag;

pub use channel::ChannelKind;
pub use decision::{decide, decide_enrollment, Decision, EnrollmentOutcome, Verdict};
pub use error::{Error, Result};
pub use events::GateEvent;
pub use resident::{AssignedState, ResidentRecord};
pub use tag::{ScanPayload, Tag, TagParseError};
