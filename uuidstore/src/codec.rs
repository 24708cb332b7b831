use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::{StoreError, StoreResult};

/// Size in bytes of one binary record
pub const RECORD_SIZE: usize = 16;

/// Length of the canonical hyphenated text form (8-4-4-4-12)
const CANONICAL_LEN: usize = 36;

/// A 128-bit identifier with a canonical text form and a 16-byte binary form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(Uuid);

impl Identifier {
    /// Parses the canonical hyphenated text form
    pub fn parse(text: &str) -> StoreResult<Self> {
        // The uuid parser also accepts simple, braced and urn forms; only the
        // hyphenated grouping is legal here.
        if text.len() != CANONICAL_LEN {
            return Err(StoreError::malformed_identifier(text));
        }
        Uuid::try_parse(text)
            .map(Self)
            .map_err(|_| StoreError::malformed_identifier(text))
    }

    /// Wraps a raw record. Any 16 bytes form a legal identifier.
    pub fn from_bytes(bytes: [u8; RECORD_SIZE]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; RECORD_SIZE] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for Identifier {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        Self::parse(s)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Encodes canonical identifier text into its 16-byte record
pub fn encode(text: &str) -> StoreResult<[u8; RECORD_SIZE]> {
    Identifier::parse(text).map(|id| *id.as_bytes())
}

/// Decodes a 16-byte record into canonical identifier text
pub fn decode(bytes: &[u8; RECORD_SIZE]) -> String {
    Identifier::from_bytes(*bytes).to_string()
}
