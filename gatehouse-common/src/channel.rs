//! Channel kinds
//!
//! A channel is one physical reader/responder pairing. Entry and Exit
//! channels run the audited access-decision pipeline; Enroll channels run
//! the simpler badge-enrollment pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a reader channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Vehicle or pedestrian entry point
    Entry,
    /// Vehicle or pedestrian exit point
    Exit,
    /// Badge enrollment station
    Enroll,
}

impl ChannelKind {
    /// Direction wording used in decision reasons ("Entry granted" /
    /// "Exit granted"). Enroll channels never reach the decision engine;
    /// the label exists only for logging symmetry.
    pub fn direction_label(&self) -> &'static str {
        match self {
            ChannelKind::Entry => "Entry",
            ChannelKind::Exit => "Exit",
            ChannelKind::Enroll => "Enroll",
        }
    }

    /// True for channels that run the access-decision pipeline
    pub fn is_access(&self) -> bool {
        matches!(self, ChannelKind::Entry | ChannelKind::Exit)
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.direction_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&ChannelKind::Entry).unwrap(), "\"entry\"");
        let kind: ChannelKind = serde_json::from_str("\"enroll\"").unwrap();
        assert_eq!(kind, ChannelKind::Enroll);
    }

    #[test]
    fn test_access_kinds() {
        assert!(ChannelKind::Entry.is_access());
        assert!(ChannelKind::Exit.is_access());
        assert!(!ChannelKind::Enroll.is_access());
    }
}
