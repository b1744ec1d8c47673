//! Session data values.
//!
//! Everything a form can send, and everything the session remembers, is one of
//! three shapes: a scalar, a sequence, or a nested mapping. [`Value`] is that
//! tagged union. [`SessionData`] is the mapping at the top.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Marker a form sends for a checkbox that was present but left unticked.
///
/// Merging a key whose value is this string removes the key. Inside a
/// sequence the element is dropped and the key kept.
pub const UNCHECKED: &str = "_unchecked";

/// Insertion-ordered mapping of field name to [`Value`].
pub type SessionData = IndexMap<String, Value>;

/// One value in [`SessionData`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Sequence(Vec<Value>),
    Mapping(SessionData),
}

impl Value {
    /// `true` for the string [`UNCHECKED`] and nothing else.
    pub fn is_unchecked(&self) -> bool {
        matches!(self, Self::String(s) if s == UNCHECKED)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&SessionData> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::Sequence(_) | Self::Mapping(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            Self::Sequence(_) | Self::Mapping(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Self::String(s.to_owned()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Self::String(s) }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Self::Bool(b) }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self { Self::Number(n.into()) }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self { Self::Number(n.into()) }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self { Self::Sequence(items) }
}

impl From<SessionData> for Value {
    fn from(map: SessionData) -> Self { Self::Mapping(map) }
}
