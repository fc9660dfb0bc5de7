//! Streaming protocol boundary types.
//!
//! The wire protocol is handled by an external client library. This module
//! only defines what the pool consumes from it.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `client` | Connector/client traits and lifecycle signals |
//! | `event` | CoT event with raw and GeoJSON forms |

// ============================================================================
// Submodules
// ============================================================================

/// Protocol client traits and signals.
pub mod client;

/// CoT event types.
pub mod event;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::{ProtocolClient, ProtocolConnector, ProtocolSession, Signal, SignalKind};
pub use event::{
    ATOM_TYPE_PREFIX, ChatPayload, CotEvent, Feature, FeatureProperties, FileSharePayload,
    TASK_TYPE_PREFIX,
};
