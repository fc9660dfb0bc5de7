//! CoT event types.
//!
//! Events are produced by the protocol client when a CoT message arrives
//! from the TAK server. Each [`CotEvent`] carries the raw decoded form
//! alongside its GeoJSON [`Feature`] form.
//!
//! # Feature Format
//!
//! ```json
//! {
//!   "id": "ANDROID-1234",
//!   "type": "Feature",
//!   "properties": {
//!     "type": "a-f-G-U-C",
//!     "how": "m-g",
//!     "callsign": "ALPHA-1",
//!     "remarks": "",
//!     "chat": { "senderCallsign": "ALPHA-1", "senderUid": "ANDROID-1234" }
//!   },
//!   "geometry": { "type": "Point", "coordinates": [-105.0, 39.7, 1600.0] }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Constants
// ============================================================================

/// Type tag prefix for atom (entity state) events.
pub const ATOM_TYPE_PREFIX: &str = "a-";

/// Type tag prefix for tasking events.
pub const TASK_TYPE_PREFIX: &str = "t-x";

// ============================================================================
// ChatPayload
// ============================================================================

/// GeoChat extension of a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    /// Callsign of the sender, also used as chatroom name.
    pub sender_callsign: String,

    /// UID of the sending device.
    pub sender_uid: String,

    /// Message id assigned by the sender, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

// ============================================================================
// FileSharePayload
// ============================================================================

/// File share extension of a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSharePayload {
    /// File name offered by the sender.
    pub name: String,

    /// Download URL, carries the content hash as `?hash=`.
    pub sender_url: String,

    /// Declared size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_in_bytes: Option<u64>,

    /// Declared SHA-256 of the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

// ============================================================================
// FeatureProperties
// ============================================================================

/// Properties of a CoT feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    /// CoT type tag, e.g. `a-f-G-U-C`.
    #[serde(rename = "type")]
    pub cot_type: String,

    /// How the position was obtained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how: Option<String>,

    /// Display callsign.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callsign: Option<String>,

    /// Free-text remarks. Holds the message body of chat events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,

    /// GeoChat payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<ChatPayload>,

    /// File share payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fileshare: Option<FileSharePayload>,

    /// Everything else the decoder extracted.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeatureProperties {
    /// Creates properties with only a type tag set.
    #[must_use]
    pub fn new(cot_type: impl Into<String>) -> Self {
        Self {
            cot_type: cot_type.into(),
            how: None,
            callsign: None,
            remarks: None,
            chat: None,
            fileshare: None,
            extra: Map::new(),
        }
    }
}

// ============================================================================
// Feature
// ============================================================================

/// GeoJSON feature form of a CoT event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// CoT UID.
    pub id: String,

    /// GeoJSON object type (always "Feature").
    #[serde(rename = "type")]
    pub feature_type: String,

    /// CoT properties.
    pub properties: FeatureProperties,

    /// GeoJSON geometry.
    pub geometry: Value,
}

impl Feature {
    /// Creates a point feature.
    #[must_use]
    pub fn point(id: impl Into<String>, properties: FeatureProperties, coordinates: [f64; 3]) -> Self {
        Self {
            id: id.into(),
            feature_type: "Feature".to_string(),
            properties,
            geometry: serde_json::json!({
                "type": "Point",
                "coordinates": coordinates,
            }),
        }
    }

    /// Returns the chat payload, if present.
    #[inline]
    #[must_use]
    pub fn chat(&self) -> Option<&ChatPayload> {
        self.properties.chat.as_ref()
    }

    /// Returns the file share payload, if present.
    #[inline]
    #[must_use]
    pub fn fileshare(&self) -> Option<&FileSharePayload> {
        self.properties.fileshare.as_ref()
    }

    /// Returns `true` if the type tag marks a tasking event.
    #[inline]
    #[must_use]
    pub fn is_task(&self) -> bool {
        self.properties.cot_type.starts_with(TASK_TYPE_PREFIX)
    }
}

// ============================================================================
// CotEvent
// ============================================================================

/// A CoT event received from (or re-submitted to) a connection.
///
/// The protocol client decodes both forms; this crate never parses
/// the wire format itself.
#[derive(Debug, Clone, PartialEq)]
pub struct CotEvent {
    /// Raw decoded form, forwarded as-is to raw viewers.
    raw: Value,
    /// Derived GeoJSON form.
    feature: Feature,
}

impl CotEvent {
    /// Creates an event from its raw and feature forms.
    #[inline]
    #[must_use]
    pub fn new(raw: Value, feature: Feature) -> Self {
        Self { raw, feature }
    }

    /// Returns the raw form.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Returns the GeoJSON feature form.
    #[inline]
    #[must_use]
    pub fn feature(&self) -> &Feature {
        &self.feature
    }

    /// Returns the CoT type tag.
    #[inline]
    #[must_use]
    pub fn cot_type(&self) -> &str {
        &self.feature.properties.cot_type
    }

    /// Returns `true` if this event describes entity state.
    ///
    /// Only atom events are forwarded to durable sinks.
    #[inline]
    #[must_use]
    pub fn is_atom(&self) -> bool {
        self.cot_type().starts_with(ATOM_TYPE_PREFIX)
    }
}

// ============================================================================
// Tests
// ============================================================================
