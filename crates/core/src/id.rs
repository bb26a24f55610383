//! Stable 128-bit identity for tasks, stages, vertices, and edges.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stable unique identifier rendered as a canonical 36-character
/// hyphenated hexadecimal string.
///
/// Two identifiers compare equal iff their string forms are equal,
/// which for `uuid::Uuid` is simply byte equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(Uuid);

#[derive(Debug, thiserror::Error)]
pub enum IdentifierError {
    #[error("invalid identifier format: {0}")]
    InvalidFormat(String),
}

impl Identifier {
    /// Generates a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a canonical hyphenated identifier string.
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| IdentifierError::InvalidFormat(s.to_string()))
    }
}

impl Default for Identifier {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn round_trips_through_string() {
        let id = Identifier::new();
        let parsed = Identifier::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!(Identifier::parse("not-a-uuid").is_err());
        assert!(Identifier::parse("").is_err());
    }

    #[test]
    fn random_identifiers_are_unique() {
        let ids: HashSet<Identifier> = (0..1000).map(|_| Identifier::new()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
