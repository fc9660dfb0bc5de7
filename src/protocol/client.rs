//! Protocol client boundary.
//!
//! The streaming protocol itself (TLS socket, framing, CoT decoding) is
//! provided by an external client library. This module defines the seam
//! the pool talks to.
//!
//! # Signals
//!
//! A connected client reports everything through one ordered channel:
//!
//! | Signal | Meaning |
//! |--------|---------|
//! | [`Signal::Event`] | A CoT event was decoded |
//! | [`Signal::SecureConnect`] | TLS handshake completed |
//! | [`Signal::Ping`] | Server keep-alive received |
//! | [`Signal::Timeout`] | Socket idle timeout |
//! | [`Signal::Error`] | Socket or TLS error |
//! | [`Signal::End`] | Remote closed the stream |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use crate::connection::AuthMaterial;
use crate::error::Result;
use crate::identifiers::ConnectionId;

use super::event::CotEvent;

// ============================================================================
// Signal
// ============================================================================

/// Lifecycle signal or event emitted by a protocol client.
#[derive(Debug, Clone)]
pub enum Signal {
    /// A decoded CoT event.
    Event(CotEvent),
    /// TLS connection established.
    SecureConnect,
    /// Keep-alive from the server.
    Ping,
    /// Idle timeout.
    Timeout,
    /// Transport error.
    Error(String),
    /// Remote end closed the stream.
    End,
}

impl Signal {
    /// Returns the signal kind without payload.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::Event(_) => SignalKind::Event,
            Self::SecureConnect => SignalKind::SecureConnect,
            Self::Ping => SignalKind::Ping,
            Self::Timeout => SignalKind::Timeout,
            Self::Error(_) => SignalKind::Error,
            Self::End => SignalKind::End,
        }
    }
}

/// Payload-free discriminant of a [`Signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// See [`Signal::Event`].
    Event,
    /// See [`Signal::SecureConnect`].
    SecureConnect,
    /// See [`Signal::Ping`].
    Ping,
    /// See [`Signal::Timeout`].
    Timeout,
    /// See [`Signal::Error`].
    Error,
    /// See [`Signal::End`].
    End,
}

impl SignalKind {
    /// Returns the signal name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::SecureConnect => "secureConnect",
            Self::Ping => "ping",
            Self::Timeout => "timeout",
            Self::Error => "error",
            Self::End => "end",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ProtocolClient
// ============================================================================

/// Handle to one streaming connection owned by the external library.
///
/// Exclusively owned by a single connection client. Only the pool calls
/// [`reconnect`](Self::reconnect) and [`destroy`](Self::destroy).
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Returns `true` while the socket is open.
    fn is_open(&self) -> bool;

    /// Re-opens the socket.
    ///
    /// Failures are also reported later as `Error` or `End` signals.
    async fn reconnect(&self) -> Result<()>;

    /// Closes the socket and stops emitting signals.
    fn destroy(&self);
}

// ============================================================================
// ProtocolSession
// ============================================================================

/// A freshly opened protocol client and its signal stream.
pub struct ProtocolSession {
    /// Client handle.
    pub client: Box<dyn ProtocolClient>,
    /// Ordered signals emitted by the client.
    pub signals: mpsc::UnboundedReceiver<Signal>,
}

impl fmt::Debug for ProtocolSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolSession")
            .field("open", &self.client.is_open())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ProtocolConnector
// ============================================================================

/// Factory that opens protocol clients.
#[async_trait]
pub trait ProtocolConnector: Send + Sync {
    /// Opens a client for `id` against `server` using mutual TLS material.
    async fn connect(
        &self,
        id: &ConnectionId,
        server: &Url,
        auth: &AuthMaterial,
    ) -> Result<ProtocolSession>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_kinds() {
        assert_eq!(Signal::End.kind(), SignalKind::End);
        assert_eq!(Signal::Error("boom".into()).kind(), SignalKind::Error);
        assert_eq!(Signal::Event(crate::testing::atom_event("a")).kind(), SignalKind::Event);
    }

    #[test]
    fn test_signal_kind_display() {
        assert_eq!(SignalKind::SecureConnect.to_string(), "secureConnect");
        assert_eq!(SignalKind::End.to_string(), "end");
    }
}
