//! CoT Relay - TAK connection pool and CoT event router.
//!
//! This library keeps a pool of long-lived streaming connections to a TAK
//! server, one per configured integration or ephemeral user session, and
//! routes every Cursor-on-Target event they receive to live viewers, chat
//! and import side effects, and durable sinks.
//!
//! # Architecture
//!
//! ```text
//!  ConfigStore ──init──► ConnectionPool ──add──► ProtocolConnector
//!                              │                       │
//!                              │               ProtocolSession
//!                              │              (client + signals)
//!                              ▼                       │
//!                       ConnectionClient ◄── driver ◄──┘
//!                              │
//!                              ▼
//!                           Router ──► ChatStore / ImportPipeline
//!                              │  ──► ViewerRegistry ──► WebSocketViewer
//!                              └───► SinkLayer
//! ```
//!
//! Key design principles:
//!
//! - Each pooled connection owns its protocol client and one driver task
//! - Signals of one connection are handled strictly in arrival order
//! - Removing a connection cancels its backoff and handshake work
//! - A failing side effect or viewer never affects the others
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use cot_relay::{ConnectionPool, PoolOptions, Result};
//!
//! async fn run() -> Result<()> {
//!     let pool = Arc::new(
//!         ConnectionPool::builder()
//!             .options(PoolOptions::new("ssl://tak.example.com:8089".parse()?))
//!             .connector(connector)
//!             .store(store)
//!             .sinks(sinks)
//!             .chats(chats)
//!             .imports(imports)
//!             .metrics(metrics)
//!             .missions(missions)
//!             .build()?,
//!     );
//!     pool.init().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`connection`] | Connection config, client, retry and handshake |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Connection and viewer ids |
//! | [`pool`] | [`ConnectionPool`] and its builder |
//! | [`protocol`] | Protocol client contract and CoT event types |
//! | [`router`] | Event routing and viewer registry |
//! | [`services`] | External collaborator traits |
//! | [`transport`] | WebSocket viewer server |

// ============================================================================
// Modules
// ============================================================================

/// Connection configuration, client state, retry and handshake.
pub mod connection;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Connection and viewer identifiers.
pub mod identifiers;

/// Connection pool.
///
/// Use [`ConnectionPool::builder()`] to create a configured pool.
pub mod pool;

/// Protocol client contract and CoT event types.
pub mod protocol;

/// Event routing and viewer fan-out.
pub mod router;

/// External collaborator contracts.
pub mod services;

/// WebSocket viewer transport.
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Connection types
pub use connection::{
    AuthMaterial, ConnectionClient, ConnectionConfig, ConnectionPhase, ConnectionRecord,
    RetryPolicy, Subscription,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ConnectionId, ViewerId};

// Pool types
pub use pool::{ConnectionPool, ConnectionStatus, PoolBuilder, PoolOptions};

// Protocol types
pub use protocol::{CotEvent, Feature, ProtocolClient, ProtocolConnector, ProtocolSession, Signal};

// Router types
pub use router::{Envelope, EnvelopeKind, Router, RouterOptions, Viewer, ViewerFormat, ViewerRegistry};

// Service traits
pub use services::{
    ChatRecord, ChatStore, ConfigStore, ImportJob, ImportMode, ImportPipeline, MetricsSink,
    MissionApi, SinkLayer,
};

// Transport types
pub use transport::{ViewerServer, WebSocketViewer};
