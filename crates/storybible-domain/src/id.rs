//! Entity identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque unique identifier for a Story Bible entity
///
/// Freshly generated ids are UUIDv7 strings, so they sort by creation time.
/// Ids coming from imports or restores are kept verbatim, whatever their shape.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Generate a new UUIDv7-based EntityId
    ///
    /// # Examples
    ///
    /// ```
    /// use storybible_domain::EntityId;
    ///
    /// let a = EntityId::new();
    /// let b = EntityId::new();
    /// assert_ne!(a, b);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Wrap an existing identifier string
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the identifier is blank
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
