//! Connection pool.
//!
//! Registry of live connection clients keyed by connection id.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                ConnectionPool                │
//! │  ┌────────────────────────────────────────┐  │
//! │  │ 1       → ConnectionClient ─► driver   │  │
//! │  │ 2       → ConnectionClient ─► driver   │  │
//! │  │ "alice" → ConnectionClient ─► driver   │  │
//! │  └────────────────────────────────────────┘  │
//! │                      │                       │
//! │                   Router ──► viewers, sinks  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Every client owns one driver task (see [`lifecycle`](super::lifecycle)).
//! Removing a client from the registry always shuts it down first, so no
//! background work outlives its entry.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::connection::{ConnectionClient, ConnectionConfig, Subscription};
use crate::error::Result;
use crate::identifiers::ConnectionId;
use crate::protocol::{CotEvent, ProtocolConnector};
use crate::router::{Router, ViewerRegistry};
use crate::services::ConfigStore;

use super::builder::PoolBuilder;
use super::lifecycle::{LifecycleContext, spawn_driver};
use super::options::PoolOptions;

// ============================================================================
// ConnectionStatus
// ============================================================================

/// Externally visible state of a pooled connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Present and the socket is open.
    Live,
    /// Present but the socket is closed.
    Dead,
    /// Not in the pool.
    Unknown,
}

impl ConnectionStatus {
    /// Returns the status name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Dead => "dead",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ConnectionPool
// ============================================================================

/// Keyed registry of live TAK connections.
///
/// Thread-safe; every operation takes `&self`. Wrap in an [`Arc`] to share
/// between request handlers.
pub struct ConnectionPool {
    /// Pool configuration.
    options: PoolOptions,

    /// Opens protocol sessions.
    connector: Arc<dyn ProtocolConnector>,

    /// Persisted connections.
    store: Arc<dyn ConfigStore>,

    /// Shared by every driver task.
    context: Arc<LifecycleContext>,

    /// Active clients by connection id.
    connections: RwLock<FxHashMap<ConnectionId, Arc<ConnectionClient>>>,
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("options", &self.options)
            .field("connections", &self.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ConnectionPool - Constructor
// ============================================================================

impl ConnectionPool {
    /// Creates a new pool builder.
    #[inline]
    #[must_use]
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    /// Creates an empty pool.
    pub(crate) fn new(
        options: PoolOptions,
        connector: Arc<dyn ProtocolConnector>,
        store: Arc<dyn ConfigStore>,
        context: LifecycleContext,
    ) -> Self {
        Self {
            options,
            connector,
            store,
            context: Arc::new(context),
            connections: RwLock::new(FxHashMap::default()),
        }
    }
}

// ============================================================================
// ConnectionPool - Accessors
// ============================================================================

impl ConnectionPool {
    /// Returns the pool options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    /// Returns the event router.
    #[inline]
    #[must_use]
    pub fn router(&self) -> &Arc<Router> {
        &self.context.router
    }

    /// Returns the viewer registry.
    #[inline]
    #[must_use]
    pub fn viewers(&self) -> &Arc<ViewerRegistry> {
        self.context.router.viewers()
    }

    /// Returns the number of pooled connections.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    /// Returns `true` if no connections are pooled.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Returns the ids of all pooled connections.
    #[must_use]
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.connections.read().keys().cloned().collect()
    }

    /// Returns the client for `id`.
    #[must_use]
    pub fn get(&self, id: &ConnectionId) -> Option<Arc<ConnectionClient>> {
        self.connections.read().get(id).cloned()
    }
}

// ============================================================================
// ConnectionPool - Loading
// ============================================================================

impl ConnectionPool {
    /// Adds every enabled persisted connection.
    ///
    /// Connections are added concurrently while the store is still being
    /// read. A failed add is logged and skipped; `init` waits for all adds
    /// to settle. Settled adds are collected before the next row is read,
    /// so they stay registered if the store fails.
    ///
    /// # Errors
    ///
    /// Returns the store's error if reading the connection stream fails.
    pub async fn init(&self) -> Result<()> {
        let mut records = self.store.connections();
        let mut pending = FuturesUnordered::new();
        let mut launched = 0usize;

        loop {
            tokio::select! {
                biased;

                Some(()) = pending.next(), if !pending.is_empty() => {}

                record = records.next() => match record {
                    Some(Ok(record)) if record.enabled => {
                        launched += 1;
                        pending.push(self.add_persisted(record.into()));
                    }
                    Some(Ok(record)) => {
                        debug!(connection_id = record.id, "Skipping disabled connection");
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "Failed to read connections");
                        return Err(e);
                    }
                    None => break,
                },
            }
        }

        while pending.next().await.is_some() {}

        info!(launched, active = self.len(), "Connection pool initialised");
        Ok(())
    }

    /// Removes every connection, then re-runs [`init`](Self::init).
    ///
    /// # Errors
    ///
    /// Same as [`init`](Self::init).
    pub async fn refresh(&self) -> Result<()> {
        for id in self.ids() {
            self.delete(&id);
        }
        self.init().await
    }

    /// Adds one persisted connection, logging failure.
    async fn add_persisted(&self, config: ConnectionConfig) {
        let id = config.id.clone();
        if let Err(e) = self.add(config, false).await {
            error!(connection_id = %id, error = %e, "Failed to add connection");
        }
    }
}

// ============================================================================
// ConnectionPool - Membership
// ============================================================================

impl ConnectionPool {
    /// Opens a connection for `config` and registers it.
    ///
    /// An existing entry with the same id is shut down and replaced.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfiguration`](crate::Error::InvalidConfiguration)
    ///   if the cert or key is missing
    /// - any error from the protocol connector
    pub async fn add(
        &self,
        config: ConnectionConfig,
        ephemeral: bool,
    ) -> Result<Arc<ConnectionClient>> {
        let auth = config.require_auth()?.clone();
        let server = config
            .server
            .clone()
            .unwrap_or_else(|| self.options.server_url.clone());

        let session = self.connector.connect(&config.id, &server, &auth).await?;

        let id = config.id.clone();
        let client = Arc::new(ConnectionClient::new(
            Arc::new(config),
            session.client,
            ephemeral,
        ));

        if let Some(previous) = self
            .connections
            .write()
            .insert(id.clone(), Arc::clone(&client))
        {
            warn!(connection_id = %id, "Replacing existing connection");
            previous.shutdown();
        }

        spawn_driver(Arc::clone(&self.context), Arc::clone(&client), session.signals);

        info!(connection_id = %id, server = %server, ephemeral, "Connection added");
        Ok(client)
    }

    /// Shuts down and removes the connection for `id`.
    ///
    /// Returns `false` if there was no such connection.
    pub fn delete(&self, id: &ConnectionId) -> bool {
        let mut connections = self.connections.write();
        let Some(client) = connections.get(id).cloned() else {
            return false;
        };

        client.shutdown();
        connections.remove(id);

        info!(connection_id = %id, "Connection deleted");
        true
    }

    /// Shuts down and removes every connection.
    pub fn shutdown(&self) {
        let drained: Vec<_> = self.connections.write().drain().collect();
        for (_, client) in &drained {
            client.shutdown();
        }
        info!(count = drained.len(), "Connection pool shut down");
    }
}

// ============================================================================
// ConnectionPool - Queries
// ============================================================================

impl ConnectionPool {
    /// Returns the status of the connection for `id`.
    #[must_use]
    pub fn status(&self, id: &ConnectionId) -> ConnectionStatus {
        match self.connections.read().get(id) {
            Some(client) if client.is_open() => ConnectionStatus::Live,
            Some(_) => ConnectionStatus::Dead,
            None => ConnectionStatus::Unknown,
        }
    }

    /// Looks up a mission subscription of a pooled connection.
    ///
    /// Always returns `name`; the token is present only when the
    /// connection is pooled, has that subscription and its token is
    /// non-empty.
    #[must_use]
    pub fn subscription(&self, id: &ConnectionId, name: &str) -> Subscription {
        let token = self
            .connections
            .read()
            .get(id)
            .and_then(|client| client.config().subscription(name))
            .and_then(|sub| sub.token.clone())
            .filter(|token| !token.is_empty());

        Subscription {
            name: name.to_string(),
            token,
        }
    }

    /// Routes an externally submitted batch as if it arrived on `config`.
    pub async fn cots(&self, config: &ConnectionConfig, events: &[CotEvent], ephemeral: bool) {
        self.context.router.route(config, events, ephemeral).await;
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        for client in self.connections.get_mut().values() {
            client.shutdown();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
