//! Entity identifiers and identity strategies.
//!
//! # Responsibility
//! - Model the temporary (client-minted) and persisted (storage-assigned)
//!   identifier phases as one sum type.
//! - Provide the canonical text form used by embedded identity tokens.
//!
//! # Invariants
//! - Temporary IDs are UUID v4 and never nil.
//! - Persisted IDs are positive SQLite row keys.
//! - `EntityId::parse_token(id.token()) == Some(id)` for every valid id.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

const TEMPORARY_PREFIX: char = 't';

/// Storage key of one board row.
pub type BoardKey = i64;

/// Identifier of a column, group, card or subtask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "phase", content = "value", rename_all = "snake_case")]
pub enum EntityId {
    /// Minted client-side before the entity was first saved.
    Temporary(Uuid),
    /// Row key assigned by persistence.
    Persisted(i64),
}

impl EntityId {
    /// Mints a new temporary identifier.
    pub fn temporary() -> Self {
        Self::Temporary(Uuid::new_v4())
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    /// Returns the row key when this id is persisted.
    pub fn persisted(&self) -> Option<i64> {
        match self {
            Self::Persisted(key) => Some(*key),
            Self::Temporary(_) => None,
        }
    }

    /// Canonical token text: `t<32 hex>` or the decimal row key.
    pub fn token(&self) -> String {
        match self {
            Self::Temporary(uuid) => format!("{TEMPORARY_PREFIX}{}", uuid.simple()),
            Self::Persisted(key) => key.to_string(),
        }
    }

    /// Decodes a canonical token. Returns `None` for anything else.
    pub fn parse_token(token: &str) -> Option<Self> {
        if let Some(hex) = token.strip_prefix(TEMPORARY_PREFIX) {
            if hex.len() != 32 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            let uuid = Uuid::parse_str(hex).ok()?;
            if uuid.is_nil() {
                return None;
            }
            return Some(Self::Temporary(uuid));
        }

        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match token.parse::<i64>() {
            Ok(key) if key > 0 => Some(Self::Persisted(key)),
            _ => None,
        }
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.token())
    }
}

/// How card and subtask identity survives a text round-trip.
///
/// Fixed for a board's lifetime; a board is never parsed or serialized under
/// the other strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityStrategy {
    /// Every parse mints new identifiers; text carries no identity.
    #[default]
    Fresh,
    /// The serializer writes `{token}` after each checkbox and the parser
    /// reuses well-formed tokens.
    Embedded,
}

impl IdentityStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Embedded => "embedded",
        }
    }
}

impl FromStr for IdentityStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fresh" => Ok(Self::Fresh),
            "embedded" => Ok(Self::Embedded),
            other => Err(format!(
                "unsupported identity strategy `{other}`; expected fresh|embedded"
            )),
        }
    }
}

impl Display for IdentityStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
