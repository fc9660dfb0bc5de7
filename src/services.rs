//! External collaborator contracts.
//!
//! The pool depends on these traits only. Storage, chat persistence,
//! import processing, metrics transport and the mission REST API are
//! implemented elsewhere.
//!
//! | Trait | Called from |
//! |-------|-------------|
//! | [`ConfigStore`] | `ConnectionPool::init` |
//! | [`SinkLayer`] | Router, after each non-ephemeral batch |
//! | [`ChatStore`] | Router, ephemeral chat events |
//! | [`ImportPipeline`] | Router, ephemeral file shares |
//! | [`MetricsSink`] | `ping` signal |
//! | [`MissionApi`] | Subscription handshake |

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::connection::{AuthMaterial, ConnectionConfig, ConnectionRecord};
use crate::error::Result;
use crate::protocol::CotEvent;

// ============================================================================
// ConfigStore
// ============================================================================

/// Source of persisted connection configurations.
pub trait ConfigStore: Send + Sync {
    /// Streams every connection row.
    ///
    /// A stream item error terminates `init` with that error.
    fn connections(&self) -> BoxStream<'_, Result<ConnectionRecord>>;
}

// ============================================================================
// SinkLayer
// ============================================================================

/// Durable forwarding destinations for atom events.
#[async_trait]
pub trait SinkLayer: Send + Sync {
    /// Forwards a batch of atom events received on `config`.
    ///
    /// Retries are the sink layer's own concern.
    async fn forward(&self, config: &ConnectionConfig, atoms: &[CotEvent]) -> Result<()>;
}

// ============================================================================
// ChatStore
// ============================================================================

/// Chat message persisted for an ephemeral connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    /// Owning username (the connection id).
    pub username: String,
    /// Chatroom name.
    pub chatroom: String,
    /// Sender callsign.
    pub sender_callsign: String,
    /// Sender device UID.
    pub sender_uid: String,
    /// Message id, generated when the sender omitted it.
    pub message_id: String,
    /// Message body.
    pub message: String,
}

/// Chat persistence.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Stores one chat message.
    async fn record(&self, record: ChatRecord) -> Result<()>;
}

// ============================================================================
// ImportPipeline
// ============================================================================

/// Import mode of a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Data package shared through the TAK server.
    Package,
}

/// Import job for a shared file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportJob {
    /// Owning username (the connection id).
    pub username: String,
    /// File name.
    pub name: String,
    /// Import mode.
    pub mode: ImportMode,
    /// Content hash identifying the package on the server.
    pub mode_id: Option<String>,
}

/// File import pipeline.
#[async_trait]
pub trait ImportPipeline: Send + Sync {
    /// Queues an import job.
    async fn submit(&self, job: ImportJob) -> Result<()>;
}

// ============================================================================
// MetricsSink
// ============================================================================

/// Heartbeat metrics for persisted connections.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Records a heartbeat for connection `id`.
    async fn post(&self, id: i64) -> Result<()>;
}

// ============================================================================
// MissionApi
// ============================================================================

/// Remote mission REST API.
#[async_trait]
pub trait MissionApi: Send + Sync {
    /// Subscribes device `uid` to `mission` using the connection's credentials.
    ///
    /// # Errors
    ///
    /// Must report an actively refused connection as
    /// [`Error::ConnectionRefused`](crate::Error::ConnectionRefused) (or an
    /// IO error of that kind) so the handshake can retry it.
    async fn subscribe(
        &self,
        auth: &AuthMaterial,
        mission: &str,
        uid: &str,
        token: Option<&str>,
    ) -> Result<()>;
}
