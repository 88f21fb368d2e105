// SPDX-License-Identifier: MIT OR Apache-2.0
//! Addressing of items inside collection content.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Key of a dictionary entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MapKey {
    /// Boolean key
    Bool(bool),
    /// Integer key
    Int(i64),
    /// String key
    String(String),
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Bool(value) => write!(f, "{value}"),
            MapKey::Int(value) => write!(f, "{value}"),
            MapKey::String(value) => write!(f, "\"{value}\""),
        }
    }
}

impl From<i64> for MapKey {
    fn from(value: i64) -> Self {
        MapKey::Int(value)
    }
}

impl From<bool> for MapKey {
    fn from(value: bool) -> Self {
        MapKey::Bool(value)
    }
}

impl From<&str> for MapKey {
    fn from(value: &str) -> Self {
        MapKey::String(value.to_string())
    }
}

impl From<String> for MapKey {
    fn from(value: String) -> Self {
        MapKey::String(value)
    }
}

/// Position of an item inside a collection, or [`Index::Empty`] when the
/// whole content is addressed.
///
/// Two indices are equal when they hold equal values of the same kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Index {
    /// No index: the content value itself
    #[default]
    Empty,
    /// Position in a list
    Int(usize),
    /// Key in a dictionary
    Key(MapKey),
}

impl Index {
    /// Create an index addressing a dictionary key
    pub fn key(key: impl Into<MapKey>) -> Self {
        Index::Key(key.into())
    }

    /// Whether this is the empty index
    pub fn is_empty(&self) -> bool {
        matches!(self, Index::Empty)
    }

    /// The list position, if this is an integer index
    pub fn as_int(&self) -> Option<usize> {
        match self {
            Index::Int(position) => Some(*position),
            _ => None,
        }
    }

    /// The dictionary key, if this is a key index
    pub fn as_key(&self) -> Option<&MapKey> {
        match self {
            Index::Key(key) => Some(key),
            _ => None,
        }
    }
}

impl From<usize> for Index {
    fn from(position: usize) -> Self {
        Index::Int(position)
    }
}

impl From<MapKey> for Index {
    fn from(key: MapKey) -> Self {
        Index::Key(key)
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Index::Empty => Ok(()),
            Index::Int(position) => write!(f, "[{position}]"),
            Index::Key(key) => write!(f, "[{key}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_index() {
        assert!(Index::Empty.is_empty());
        assert!(Index::default().is_empty());
        assert!(!Index::Int(0).is_empty());
        assert_eq!(Index::Empty.to_string(), "");
    }

    #[test]
    fn test_index_equality_is_by_value_and_kind() {
        assert_eq!(Index::from(3), Index::Int(3));
        assert_eq!(Index::key("a"), Index::Key(MapKey::String("a".into())));
        assert_ne!(Index::key(1i64), Index::Int(1));
        assert_ne!(Index::Int(1), Index::Int(2));
    }

    #[test]
    fn test_index_display() {
        assert_eq!(Index::Int(2).to_string(), "[2]");
        assert_eq!(Index::key("name").to_string(), "[\"name\"]");
        assert_eq!(Index::key(true).to_string(), "[true]");
    }

    #[test]
    fn test_index_ron_round_trip() {
        let index = Index::key("Member1");
        let ron_str = ron::ser::to_string_pretty(&index, ron::ser::PrettyConfig::default()).unwrap();
        let loaded: Index = ron::from_str(&ron_str).unwrap();
        assert_eq!(loaded, index);
    }
}
