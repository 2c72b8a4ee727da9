//! Tag validation and scan-payload classification
//!
//! Readers deliver one token per line: either an 8-character hexadecimal
//! tag identifier or the literal `ping` liveness echo. Tags are
//! case-insensitive on the wire and normalized to uppercase here so that
//! equality, hashing, and store keys all agree.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum length of raw payload echoed back in parse errors.
/// Serial lines can carry arbitrary garbage; keep logs bounded.
const MAX_ECHO_LEN: usize = 64;

/// Error returned when a scan payload is not a valid tag
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("not an 8-character hex identifier: {0:?}")]
pub struct TagParseError(pub String);

/// Normalized RFID tag identifier
///
/// Always exactly 8 uppercase hexadecimal characters. Immutable once
/// parsed; equality and hashing operate on the normalized form, so
/// `"deadbeef"` and `"DEADBEEF"` produce equal tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Tag(String);

impl Tag {
    /// Parse and normalize a raw tag payload
    ///
    /// Trims surrounding whitespace, then requires exactly 8 ASCII hex
    /// digits. Returns the uppercase-normalized tag.
    pub fn parse(raw: &str) -> Result<Self, TagParseError> {
        let trimmed = raw.trim();
        if trimmed.len() == 8 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Tag(trimmed.to_ascii_uppercase()))
        } else {
            let mut echo = raw.trim().to_string();
            // The cut must land on a char boundary; garbage lines can
            // carry multi-byte UTF-8
            let mut cut = MAX_ECHO_LEN.min(echo.len());
            while !echo.is_char_boundary(cut) {
                cut -= 1;
            }
            echo.truncate(cut);
            Err(TagParseError(echo))
        }
    }

    /// Normalized tag string (8 uppercase hex characters)
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Tag {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tag::parse(s)
    }
}

impl TryFrom<String> for Tag {
    type Error = TagParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Tag::parse(&value)
    }
}

/// Classified scan-line payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanPayload {
    /// A validated, normalized tag read
    Tag(Tag),
    /// The `ping` liveness echo, discarded upstream and never treated
    /// as an invalid tag
    Ping,
}

impl ScanPayload {
    /// Classify one raw line from a reader channel
    ///
    /// `"ping"` (any case, surrounding whitespace allowed) is the
    /// liveness echo; anything else must parse as a tag.
    pub fn parse(raw: &str) -> Result<Self, TagParseError> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("ping") {
            return Ok(ScanPayload::Ping);
        }
        Tag::parse(trimmed).map(ScanPayload::Tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_uppercase_tag() {
        let tag = Tag::parse("1A2B3C4D").unwrap();
        assert_eq!(tag.as_str(), "1A2B3C4D");
    }

    #[test]
    fn test_normalizes_lowercase_tag() {
        let tag = Tag::parse("deadbeef").unwrap();
        assert_eq!(tag.as_str(), "DEADBEEF");
    }

    #[test]
    fn test_normalizes_mixed_case_and_whitespace() {
        let tag = Tag::parse("  aB12cD34\r\n").unwrap();
        assert_eq!(tag.as_str(), "AB12CD34");
    }

    #[test]
    fn test_case_insensitive_equality() {
        assert_eq!(Tag::parse("deadbeef").unwrap(), Tag::parse("DEADBEEF").unwrap());
    }

    #[test]
    fn test_rejects_short_and_long_payloads() {
        assert!(Tag::parse("1234567").is_err());
        assert!(Tag::parse("123456789").is_err());
    }

    #[test]
    fn test_rejects_non_hex_characters() {
        assert!(Tag::parse("1234567G").is_err());
        assert!(Tag::parse("12 45678").is_err());
    }

    #[test]
    fn test_rejects_empty_payload() {
        assert!(Tag::parse("").is_err());
        assert!(Tag::parse("   \r\n").is_err());
    }

    #[test]
    fn test_error_echoes_offending_payload() {
        let err = Tag::parse("badtoken!").unwrap_err();
        assert_eq!(err.0, "badtoken!");
    }

    #[test]
    fn test_error_echo_is_bounded() {
        let long = "x".repeat(500);
        let err = Tag::parse(&long).unwrap_err();
        assert_eq!(err.0.len(), MAX_ECHO_LEN);
    }

    #[test]
    fn test_error_echo_truncates_on_char_boundary() {
        // 30 three-byte chars put the byte limit inside a char
        let garbled = "€".repeat(30);
        let err = ScanPayload::parse(&garbled).unwrap_err();
        assert!(err.0.len() <= MAX_ECHO_LEN);
        assert!(garbled.starts_with(&err.0));
    }

    #[test]
    fn test_classifies_ping_any_case() {
        assert_eq!(ScanPayload::parse("ping").unwrap(), ScanPayload::Ping);
        assert_eq!(ScanPayload::parse("PING").unwrap(), ScanPayload::Ping);
        assert_eq!(ScanPayload::parse(" Ping \n").unwrap(), ScanPayload::Ping);
    }

    #[test]
    fn test_classifies_tag_payload() {
        let payload = ScanPayload::parse("deadbeef").unwrap();
        assert_eq!(payload, ScanPayload::Tag(Tag::parse("DEADBEEF").unwrap()));
    }

    #[test]
    fn test_ping_is_never_a_tag_error() {
        // "ping" fails the hex pattern but must classify as liveness echo
        assert_eq!(ScanPayload::parse("ping").unwrap(), ScanPayload::Ping);
    }

    #[test]
    fn test_invalid_payload_is_an_error() {
        assert!(ScanPayload::parse("hello world").is_err());
        assert!(ScanPayload::parse("pinge").is_err());
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let tag = Tag::parse("1A2B3C4D").unwrap();
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, "\"1A2B3C4D\"");

        let back: Tag = serde_json::from_str("\"deadbeef\"").unwrap();
        assert_eq!(back.as_str(), "DEADBEEF");

        let bad: Result<Tag, _> = serde_json::from_str("\"nothex\"");
        assert!(bad.is_err());
    }
}
