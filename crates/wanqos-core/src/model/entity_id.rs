// ── Class identity ──
//
// Every user-created class is keyed by a random UUID. The root of the
// tree is the one exception: it carries the fixed name "root" so that
// every process instance agrees on its key without coordination.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Primary key of the sentinel root class.
pub const ROOT_ID: &str = "root";

// ── EntityId ────────────────────────────────────────────────────────

/// Opaque primary key of a traffic class.
///
/// Serializes as a plain string in both variants, so API consumers and
/// the SQLite backend only ever see text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Uuid(Uuid),
    Named(String),
}

impl EntityId {
    /// A fresh random identifier for a new class.
    pub fn generate() -> Self {
        Self::Uuid(Uuid::new_v4())
    }

    /// The key of the sentinel root class.
    pub fn root() -> Self {
        Self::Named(ROOT_ID.to_owned())
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Self::Named(name) if name == ROOT_ID)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Named(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_owned()))
    }
}

impl From<Uuid> for EntityId {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        match Uuid::parse_str(&s) {
            Ok(u) => Self::Uuid(u),
            Err(_) => Self::Named(s),
        }
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}
