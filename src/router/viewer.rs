//! Live viewer registry.
//!
//! Viewers are created and destroyed by the transport layer (see
//! [`ViewerServer`](crate::transport::ViewerServer)). The router only reads
//! the registry and calls [`Viewer::send`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::{ConnectionId, ViewerId};

use super::envelope::Envelope;

// ============================================================================
// ViewerFormat
// ============================================================================

/// Payload form a viewer wants to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ViewerFormat {
    /// GeoJSON features, classified as chat/task/cot.
    #[default]
    #[serde(rename = "geojson")]
    Feature,
    /// Raw decoded CoT, always typed `cot`.
    #[serde(rename = "raw")]
    Raw,
}

impl ViewerFormat {
    /// Returns the format name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Feature => "geojson",
            Self::Raw => "raw",
        }
    }
}

impl fmt::Display for ViewerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewerFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "geojson" => Ok(Self::Feature),
            "raw" => Ok(Self::Raw),
            other => Err(Error::config(format!("Unknown viewer format: {other}"))),
        }
    }
}

// ============================================================================
// Viewer
// ============================================================================

/// A live consumer of one connection's events.
pub trait Viewer: Send + Sync {
    /// Returns the payload form this viewer expects.
    fn format(&self) -> ViewerFormat;

    /// Delivers one envelope.
    ///
    /// A failure only affects this viewer and this envelope.
    fn send(&self, envelope: &Envelope) -> Result<()>;
}

// ============================================================================
// ViewerRegistry
// ============================================================================

/// Registered viewers for a connection.
type ViewerList = Vec<(ViewerId, Arc<dyn Viewer>)>;

/// Connection id → registered viewers.
///
/// Keyed by the id's rendered form: a viewer asking for `?connection=12`
/// sees both persisted connection `12` and an ephemeral connection named
/// `"12"`.
///
/// Thread-safe; all access goes through `&self`.
#[derive(Default)]
pub struct ViewerRegistry {
    /// Viewers by rendered connection id.
    viewers: RwLock<FxHashMap<String, ViewerList>>,
}

impl fmt::Debug for ViewerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewerRegistry")
            .field("connections", &self.viewers.read().len())
            .field("viewers", &self.total())
            .finish()
    }
}

impl ViewerRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a viewer for `connection`.
    pub fn register(&self, connection: ConnectionId, viewer: Arc<dyn Viewer>) -> ViewerId {
        let viewer_id = ViewerId::next();
        debug!(connection_id = %connection, viewer_id = %viewer_id, format = %viewer.format(), "Viewer registered");
        self.viewers
            .write()
            .entry(connection.to_string())
            .or_default()
            .push((viewer_id, viewer));
        viewer_id
    }

    /// Removes a viewer. Returns `false` if it was not registered.
    pub fn unregister(&self, connection: &ConnectionId, viewer_id: ViewerId) -> bool {
        let mut viewers = self.viewers.write();
        let key = connection.to_string();
        let Some(list) = viewers.get_mut(&key) else {
            return false;
        };

        let before = list.len();
        list.retain(|(id, _)| *id != viewer_id);
        let removed = list.len() != before;

        if list.is_empty() {
            viewers.remove(&key);
        }

        if removed {
            debug!(connection_id = %connection, viewer_id = %viewer_id, "Viewer unregistered");
        }
        removed
    }

    /// Returns a snapshot of the viewers for `connection`.
    #[must_use]
    pub fn viewers(&self, connection: &ConnectionId) -> Vec<Arc<dyn Viewer>> {
        self.viewers
            .read()
            .get(&connection.to_string())
            .map(|list| list.iter().map(|(_, viewer)| Arc::clone(viewer)).collect())
            .unwrap_or_default()
    }

    /// Returns the number of viewers for `connection`.
    #[must_use]
    pub fn count(&self, connection: &ConnectionId) -> usize {
        self.viewers
            .read()
            .get(&connection.to_string())
            .map_or(0, Vec::len)
    }

    /// Returns the number of viewers across all connections.
    #[must_use]
    pub fn total(&self) -> usize {
        self.viewers.read().values().map(Vec::len).sum()
    }
}

// ============================================================================
// Tests
// ============================================================================
