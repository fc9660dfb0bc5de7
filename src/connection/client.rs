//! Connection client and its lifecycle state machine.
//!
//! # States
//!
//! ```text
//!                 secureConnect / event
//!   Connecting ─────────────────────────► Live
//!       │                                  │ ▲
//!       │ end / timeout / error            │ │ secureConnect / event
//!       ▼                                  ▼ │
//!   Retrying ◄──────────────────────── end / timeout / error
//! ```
//!
//! There is no terminal state; only `ConnectionPool::delete` ends a client.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::identifiers::ConnectionId;
use crate::protocol::{ProtocolClient, SignalKind};

use super::config::ConnectionConfig;

// ============================================================================
// ConnectionPhase
// ============================================================================

/// Lifecycle phase of a connection client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionPhase {
    /// Initial connect in progress.
    Connecting,
    /// Connected and receiving.
    Live,
    /// Waiting to reconnect after a transport failure.
    Retrying,
}

// ============================================================================
// LifecycleAction
// ============================================================================

/// Work the driver must perform after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Route the received event.
    Route,
    /// Run the subscription handshake.
    Handshake,
    /// Invoke the retry controller.
    Retry,
    /// Post a heartbeat metric.
    Heartbeat,
}

// ============================================================================
// LifecycleState
// ============================================================================

/// Mutable per-connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleState {
    /// Current phase.
    pub phase: ConnectionPhase,
    /// Consecutive retries since the last received event.
    pub retry_count: u32,
    /// `true` until the first event arrives.
    pub initial: bool,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self {
            phase: ConnectionPhase::Connecting,
            retry_count: 0,
            initial: true,
        }
    }
}

impl LifecycleState {
    /// Applies a signal and returns the resulting action.
    pub fn apply(&mut self, signal: SignalKind) -> LifecycleAction {
        match signal {
            SignalKind::Event => {
                self.phase = ConnectionPhase::Live;
                self.retry_count = 0;
                self.initial = false;
                LifecycleAction::Route
            }
            SignalKind::SecureConnect => {
                self.phase = ConnectionPhase::Live;
                LifecycleAction::Handshake
            }
            SignalKind::Timeout | SignalKind::Error | SignalKind::End => {
                self.phase = ConnectionPhase::Retrying;
                LifecycleAction::Retry
            }
            SignalKind::Ping => LifecycleAction::Heartbeat,
        }
    }
}

// ============================================================================
// ConnectionClient
// ============================================================================

/// One pooled connection: configuration, protocol client and lifecycle.
///
/// The protocol client is owned exclusively by this value; nothing else
/// may reconnect or destroy it.
pub struct ConnectionClient {
    /// Owning configuration.
    config: Arc<ConnectionConfig>,
    /// Exclusively owned protocol client.
    protocol: Box<dyn ProtocolClient>,
    /// Ephemeral connections skip sinks and metrics.
    ephemeral: bool,
    /// Guarded lifecycle state.
    lifecycle: Mutex<LifecycleState>,
    /// Cancels the driver task, backoff wait and handshake.
    cancel: CancellationToken,
}

impl fmt::Debug for ConnectionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionClient")
            .field("id", &self.config.id)
            .field("ephemeral", &self.ephemeral)
            .field("lifecycle", &*self.lifecycle.lock())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ConnectionClient - Constructor
// ============================================================================

impl ConnectionClient {
    /// Creates a client in the `Connecting` phase.
    pub(crate) fn new(
        config: Arc<ConnectionConfig>,
        protocol: Box<dyn ProtocolClient>,
        ephemeral: bool,
    ) -> Self {
        Self {
            config,
            protocol,
            ephemeral,
            lifecycle: Mutex::new(LifecycleState::default()),
            cancel: CancellationToken::new(),
        }
    }
}

// ============================================================================
// ConnectionClient - Accessors
// ============================================================================

impl ConnectionClient {
    /// Returns the connection id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ConnectionId {
        &self.config.id
    }

    /// Returns the owning configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &Arc<ConnectionConfig> {
        &self.config
    }

    /// Returns `true` for ephemeral connections.
    #[inline]
    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    /// Returns `true` while the protocol client reports an open socket.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.protocol.is_open()
    }

    /// Returns a snapshot of the lifecycle state.
    #[inline]
    #[must_use]
    pub fn lifecycle(&self) -> LifecycleState {
        *self.lifecycle.lock()
    }

    /// Returns the current phase.
    #[inline]
    #[must_use]
    pub fn phase(&self) -> ConnectionPhase {
        self.lifecycle.lock().phase
    }

    /// Returns the current retry count.
    #[inline]
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.lifecycle.lock().retry_count
    }

    /// Returns `true` until the first event has been received.
    #[inline]
    #[must_use]
    pub fn is_initial(&self) -> bool {
        self.lifecycle.lock().initial
    }

    /// Returns `true` once the client has been shut down.
    #[inline]
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

// ============================================================================
// ConnectionClient - Internal
// ============================================================================

impl ConnectionClient {
    /// Applies a signal under the lifecycle lock.
    pub(crate) fn apply(&self, signal: SignalKind) -> LifecycleAction {
        self.lifecycle.lock().apply(signal)
    }

    /// Runs `f` with exclusive access to the lifecycle state.
    pub(crate) fn with_lifecycle<R>(&self, f: impl FnOnce(&mut LifecycleState) -> R) -> R {
        f(&mut self.lifecycle.lock())
    }

    /// Returns the protocol client.
    #[inline]
    pub(crate) fn protocol(&self) -> &dyn ProtocolClient {
        self.protocol.as_ref()
    }

    /// Returns the cancellation token tied to this client's lifetime.
    #[inline]
    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Stops background work and destroys the protocol client.
    ///
    /// Idempotent: the protocol client is destroyed at most once.
    pub(crate) fn shutdown(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.protocol.destroy();
        debug!(connection_id = %self.config.id, "Connection client shut down");
    }
}

// ============================================================================
// Tests
// ============================================================================
