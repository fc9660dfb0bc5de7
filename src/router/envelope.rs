//! Viewer envelopes.
//!
//! Every message pushed to a live viewer has the shape
//!
//! ```json
//! { "type": "chat" | "task" | "cot", "connection": 3, "data": { ... } }
//! ```
//!
//! where `data` is either the GeoJSON feature or the raw decoded CoT,
//! depending on the viewer's format.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::ConnectionId;
use crate::protocol::Feature;

// ============================================================================
// EnvelopeKind
// ============================================================================

/// Classification of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    /// GeoChat message.
    Chat,
    /// Tasking event (`t-x*`).
    Task,
    /// Anything else.
    Cot,
}

impl EnvelopeKind {
    /// Classifies a feature: chat payload first, then the task prefix.
    #[must_use]
    pub fn classify(feature: &Feature) -> Self {
        if feature.chat().is_some() {
            Self::Chat
        } else if feature.is_task() {
            Self::Task
        } else {
            Self::Cot
        }
    }
}

// ============================================================================
// EnvelopeData
// ============================================================================

/// Payload of an envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EnvelopeData {
    /// GeoJSON feature form.
    Feature(Feature),
    /// Raw decoded form.
    Raw(Value),
}

// ============================================================================
// Envelope
// ============================================================================

/// A message delivered to one live viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    /// Envelope classification.
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    /// Connection the event belongs to.
    pub connection: ConnectionId,
    /// Event payload.
    pub data: EnvelopeData,
}

impl Envelope {
    /// Builds a feature envelope, classified from the feature.
    #[must_use]
    pub fn feature(connection: ConnectionId, feature: Feature) -> Self {
        Self {
            kind: EnvelopeKind::classify(&feature),
            connection,
            data: EnvelopeData::Feature(feature),
        }
    }

    /// Builds a raw envelope. Raw envelopes are always `cot`.
    #[must_use]
    pub fn raw(connection: ConnectionId, raw: Value) -> Self {
        Self {
            kind: EnvelopeKind::Cot,
            connection,
            data: EnvelopeData::Raw(raw),
        }
    }

    /// Serializes the envelope to JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
