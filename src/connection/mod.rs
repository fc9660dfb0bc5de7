//! Per-connection state and behavior.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `client` | [`ConnectionClient`] and its lifecycle state machine |
//! | `config` | Connection configuration and persisted rows |
//! | `handshake` | Mission subscription handshake |
//! | `retry` | Reconnect backoff |

// ============================================================================
// Submodules
// ============================================================================

/// Connection client and lifecycle state.
pub mod client;

/// Connection configuration.
pub mod config;

/// Mission subscription handshake.
pub mod handshake;

/// Reconnect backoff.
pub mod retry;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::{ConnectionClient, ConnectionPhase, LifecycleAction, LifecycleState};
pub use config::{AuthMaterial, ConnectionConfig, ConnectionRecord, Subscription};
pub use handshake::{DEFAULT_SUBSCRIBE_RETRY_DELAY, HandshakeReport, subscribe_all};
pub use retry::{RetryPolicy, retry};
