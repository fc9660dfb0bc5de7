//! Error types for the connection pool.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use cot_relay::{ConnectionConfig, Result};
//!
//! async fn example(pool: &ConnectionPool, config: ConnectionConfig) -> Result<()> {
//!     pool.add(config, false).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants | Handling |
//! |----------|----------|----------|
//! | Configuration | [`Error::InvalidConfiguration`], [`Error::Config`] | Rejects the call |
//! | Configuration source | [`Error::ConfigSource`] | Aborts `init` |
//! | Handshake | [`Error::ConnectionRefused`], [`Error::Handshake`] | Retried / abandoned |
//! | Transport | [`Error::Transport`], [`Error::ConnectionClosed`] | Routed to retry |
//! | Side effects | [`Error::SideEffect`] | Logged where it occurs |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::Url`], [`Error::WebSocket`] | Wrapped |

// ============================================================================
// Imports
// ============================================================================

use std::io::{Error as IoError, ErrorKind};
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;
use url::ParseError as UrlError;

use crate::identifiers::ConnectionId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Connection configuration is unusable.
    ///
    /// Returned by `add` when certificate or key material is missing.
    #[error("Invalid configuration for connection {connection_id}: {message}")]
    InvalidConfiguration {
        /// Connection the configuration belongs to.
        connection_id: ConnectionId,
        /// Description of what is missing.
        message: String,
    },

    /// Pool configuration error.
    ///
    /// Returned when the pool builder is missing a collaborator.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// The persisted configuration source failed while streaming rows.
    #[error("Configuration source error: {message}")]
    ConfigSource {
        /// Description of the read failure.
        message: String,
    },

    // ========================================================================
    // Handshake Errors
    // ========================================================================
    /// The remote endpoint actively refused the connection.
    ///
    /// Retried indefinitely by the subscription handshake.
    #[error("Connection refused: {message}")]
    ConnectionRefused {
        /// Description of the refusal.
        message: String,
    },

    /// Mission subscription failed for any reason other than a refusal.
    #[error("Subscription to {mission} failed: {message}")]
    Handshake {
        /// Mission being subscribed to.
        mission: String,
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Protocol client reported a transport failure.
    #[error("Transport failure on {connection_id}: {message}")]
    Transport {
        /// Connection that failed.
        connection_id: ConnectionId,
        /// Description of the failure.
        message: String,
    },

    /// Channel or socket closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Side Effect Errors
    // ========================================================================
    /// A chat, import, metrics or viewer side effect failed.
    #[error("{operation} failed: {message}")]
    SideEffect {
        /// Name of the side effect.
        operation: &'static str,
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates an invalid configuration error.
    #[inline]
    pub fn invalid_configuration(connection_id: ConnectionId, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            connection_id,
            message: message.into(),
        }
    }

    /// Creates a pool configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a configuration source error.
    #[inline]
    pub fn config_source(message: impl Into<String>) -> Self {
        Self::ConfigSource {
            message: message.into(),
        }
    }

    /// Creates a connection refused error.
    #[inline]
    pub fn connection_refused(message: impl Into<String>) -> Self {
        Self::ConnectionRefused {
            message: message.into(),
        }
    }

    /// Creates a handshake error.
    #[inline]
    pub fn handshake(mission: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handshake {
            mission: mission.into(),
            message: message.into(),
        }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(connection_id: ConnectionId, message: impl Into<String>) -> Self {
        Self::Transport {
            connection_id,
            message: message.into(),
        }
    }

    /// Creates a side effect error.
    #[inline]
    pub fn side_effect(operation: &'static str, message: impl Into<String>) -> Self {
        Self::SideEffect {
            operation,
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the remote endpoint refused the connection.
    ///
    /// Also matches wrapped IO errors of kind [`ErrorKind::ConnectionRefused`].
    #[inline]
    #[must_use]
    pub fn is_connection_refused(&self) -> bool {
        match self {
            Self::ConnectionRefused { .. } => true,
            Self::Io(e) => e.kind() == ErrorKind::ConnectionRefused,
            _ => false,
        }
    }

    /// Returns `true` if this is a transport failure.
    #[inline]
    #[must_use]
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is an isolated side effect failure.
    #[inline]
    #[must_use]
    pub fn is_side_effect_failure(&self) -> bool {
        matches!(self, Self::SideEffect { .. })
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.is_connection_refused() || self.is_transport_failure()
    }
}

// ============================================================================
// Tests
// ============================================================================
