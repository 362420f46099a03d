//! Internal implementation of the canonical visit identifier.

use crate::{VisitIdError, VisitIdResult};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// HVN's canonical visit identifier (32 lowercase hex characters, no hyphens).
///
/// This wrapper type guarantees that once constructed, the contained UUID is in HVN's
/// canonical format. It provides type safety for identifier operations and ensures
/// consistent path derivation across the system.
///
/// # When to use this type
/// Use this wrapper whenever you are:
/// - Accepting a visit identifier from *outside* the core (CLI input, API request, etc), or
/// - Deriving a sharded storage path for a visit document, or
/// - Allocating an identifier for a newly created visit.
///
/// Once you have a `VisitId`, you can safely assume the internal UUID is valid and in
/// canonical form.
///
/// # Construction
/// - [`VisitId::new`] generates a new canonical identifier (for new visits).
/// - [`VisitId::parse`] validates an externally supplied identifier.
///
/// # Errors
/// [`VisitId::parse`] returns [`VisitIdError::InvalidInput`] if the input is not already
/// canonical.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VisitId(Uuid);

impl Default for VisitId {
    fn default() -> Self {
        Self::new()
    }
}

impl VisitId {
    /// Generates a new identifier in HVN's canonical form.
    ///
    /// This is suitable for allocating a fresh identifier during visit creation. The
    /// generated UUID is cryptographically secure and follows RFC 4122 version 4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier string that must already be in canonical form.
    ///
    /// This does **not** normalise other common UUID forms (for example, hyphenated or
    /// uppercase). Callers must provide the canonical representation. This strict
    /// validation ensures consistency and prevents issues with different identifier
    /// representations reaching the store.
    ///
    /// # Errors
    ///
    /// Returns [`VisitIdError::InvalidInput`] if `input` is not in canonical form.
    pub fn parse(input: &str) -> VisitIdResult<Self> {
        if Self::is_canonical(input) {
            // SAFETY: is_canonical guarantees valid hex, so parse_str will succeed
            let uuid = Uuid::parse_str(input).expect("is_canonical guarantees valid UUID");
            return Ok(Self(uuid));
        }
        Err(VisitIdError::InvalidInput(format!(
            "visit id must be 32 lowercase hex characters without hyphens, got: '{}'",
            input
        )))
    }

    /// Returns the identifier as a `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is in HVN's canonical identifier form.
    ///
    /// This is a purely syntactic check that validates:
    /// - Exactly 32 bytes long
    /// - Contains only lowercase hex characters (`0-9` and `a-f`)
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns `parent_dir/<s1>/<s2>/<id>/` where `s1`/`s2` are derived from this identifier.
    ///
    /// This implements HVN's sharding scheme:
    /// - `s1` is the first two hex characters of the identifier
    /// - `s2` is the next two hex characters
    /// - The full identifier forms the leaf directory
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.0.simple().to_string();
        let s1 = &canonical[0..2];
        let s2 = &canonical[2..4];
        parent_dir.join(s1).join(s2).join(&canonical)
    }
}

impl fmt::Display for VisitId {
    /// Formats the identifier in canonical form (32 lowercase hex characters, no hyphens).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Display in canonical (simple) form
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for VisitId {
    type Err = VisitIdError;

    /// Parses a string into a `VisitId`, requiring canonical form.
    ///
    /// This is equivalent to calling [`VisitId::parse`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VisitId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for VisitId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for VisitId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        VisitId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_canonical_id() {
        let id = VisitId::new();
        let canonical = id.to_string();

        assert_eq!(canonical.len(), 32);
        assert!(VisitId::is_canonical(&canonical));
    }

    #[test]
    fn parse_accepts_canonical_id() {
        let canonical = "550e8400e29b41d4a716446655440000";
        let id = VisitId::parse(canonical).expect("canonical form");
        assert_eq!(id.to_string(), canonical);
    }

    #[test]
    fn parse_rejects_hyphenated_id() {
        let result = VisitId::parse("550e8400-e29b-41d4-a716-446655440000");

        match result {
            Err(VisitIdError::InvalidInput(msg)) => {
                assert!(msg.contains("32 lowercase hex characters"));
            }
            other => panic!("expected InvalidInput error, got {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_uppercase_and_bad_lengths() {
        assert!(VisitId::parse("550E8400E29B41D4A716446655440000").is_err());
        assert!(VisitId::parse("550e8400e29b41d4a71644665544000").is_err());
        assert!(VisitId::parse("550e8400e29b41d4a7164466554400000").is_err());
        assert!(VisitId::parse("550e8400e29b41d4a716446655440zzz").is_err());
        assert!(VisitId::parse("").is_err());
    }

    #[test]
    fn sharded_dir_structure() {
        let id = VisitId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let parent = Path::new("/visit_data/visits");
        let sharded = id.sharded_dir(parent);

        assert_eq!(
            sharded,
            PathBuf::from("/visit_data/visits/55/0e/550e8400e29b41d4a716446655440000")
        );
    }

    #[test]
    fn round_trip_new_to_string_to_parse() {
        let original = VisitId::new();
        let parsed = VisitId::parse(&original.to_string()).unwrap();
        assert_eq!(original, parsed);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip_requires_canonical_form() {
        let id = VisitId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"550e8400e29b41d4a716446655440000\"");

        let back: VisitId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        let err = serde_json::from_str::<VisitId>("\"not-canonical\"");
        assert!(err.is_err());
    }
}
