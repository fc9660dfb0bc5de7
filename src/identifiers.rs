//! Type-safe identifiers for pool entities.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//!
//! | Type | Backing | Source |
//! |------|---------|--------|
//! | [`ConnectionId`] | `i64` or `String` | Persisted row id or ephemeral name |
//! | [`ViewerId`] | `u64` | Allocated per live viewer registration |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// ConnectionId
// ============================================================================

/// Stable identifier of a connection configuration.
///
/// Persisted configurations use their numeric row id. Ephemeral
/// configurations are keyed by a string (typically a username).
///
/// Serializes untagged, so `3` and `"alice"` round-trip as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConnectionId {
    /// Numeric id of a persisted configuration.
    Numeric(i64),
    /// String id of an ephemeral configuration.
    Named(String),
}

impl ConnectionId {
    /// Returns the numeric id, if this is a persisted connection.
    #[inline]
    #[must_use]
    pub fn as_numeric(&self) -> Option<i64> {
        match self {
            Self::Numeric(id) => Some(*id),
            Self::Named(_) => None,
        }
    }

    /// Returns `true` if this id is numeric.
    #[inline]
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }

    /// Parses an id from text, preferring the numeric form.
    ///
    /// `"12"` becomes `Numeric(12)`, anything else is `Named`.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        text.parse::<i64>()
            .map_or_else(|_| Self::Named(text.to_string()), Self::Numeric)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

impl From<i64> for ConnectionId {
    #[inline]
    fn from(id: i64) -> Self {
        Self::Numeric(id)
    }
}

impl From<&str> for ConnectionId {
    #[inline]
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for ConnectionId {
    #[inline]
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

// ============================================================================
// ViewerId
// ============================================================================

/// Global counter for viewer ids.
static NEXT_VIEWER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of one live viewer registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewerId(u64);

impl ViewerId {
    /// Allocates the next process-unique viewer id.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_VIEWER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
