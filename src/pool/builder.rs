//! Builder pattern for pool configuration.
//!
//! Provides a fluent API for wiring collaborators into a
//! [`ConnectionPool`].
//!
//! # Example
//!
//! ```ignore
//! use cot_relay::{ConnectionPool, PoolOptions};
//!
//! let pool = ConnectionPool::builder()
//!     .options(PoolOptions::new(server_url))
//!     .connector(connector)
//!     .store(store)
//!     .sinks(sinks)
//!     .chats(chats)
//!     .imports(imports)
//!     .metrics(metrics)
//!     .missions(missions)
//!     .build()?;
//! pool.init().await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::{Error, Result};
use crate::protocol::ProtocolConnector;
use crate::router::{Router, ViewerRegistry};
use crate::services::{ChatStore, ConfigStore, ImportPipeline, MetricsSink, MissionApi, SinkLayer};

use super::core::ConnectionPool;
use super::lifecycle::LifecycleContext;
use super::options::PoolOptions;

// ============================================================================
// PoolBuilder
// ============================================================================

/// Builder for configuring a [`ConnectionPool`].
///
/// Use [`ConnectionPool::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct PoolBuilder {
    /// Pool configuration.
    options: Option<PoolOptions>,
    /// Opens protocol sessions.
    connector: Option<Arc<dyn ProtocolConnector>>,
    /// Persisted connections.
    store: Option<Arc<dyn ConfigStore>>,
    /// Durable sinks.
    sinks: Option<Arc<dyn SinkLayer>>,
    /// Chat persistence.
    chats: Option<Arc<dyn ChatStore>>,
    /// File imports.
    imports: Option<Arc<dyn ImportPipeline>>,
    /// Heartbeat metrics.
    metrics: Option<Arc<dyn MetricsSink>>,
    /// Mission API.
    missions: Option<Arc<dyn MissionApi>>,
    /// Shared viewer registry.
    viewers: Option<Arc<ViewerRegistry>>,
}

impl fmt::Debug for PoolBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuilder")
            .field("options", &self.options)
            .field("connector", &self.connector.is_some())
            .field("store", &self.store.is_some())
            .field("sinks", &self.sinks.is_some())
            .field("chats", &self.chats.is_some())
            .field("imports", &self.imports.is_some())
            .field("metrics", &self.metrics.is_some())
            .field("missions", &self.missions.is_some())
            .field("viewers", &self.viewers.is_some())
            .finish()
    }
}

// ============================================================================
// PoolBuilder Implementation
// ============================================================================

impl PoolBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pool options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: PoolOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Sets only the streaming server URL, keeping default options.
    #[inline]
    #[must_use]
    pub fn server_url(mut self, url: Url) -> Self {
        self.options = Some(match self.options.take() {
            Some(mut options) => {
                options.server_url = url;
                options
            }
            None => PoolOptions::new(url),
        });
        self
    }

    /// Sets the protocol connector.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn ProtocolConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Sets the configuration store.
    #[inline]
    #[must_use]
    pub fn store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the sink layer.
    #[inline]
    #[must_use]
    pub fn sinks(mut self, sinks: Arc<dyn SinkLayer>) -> Self {
        self.sinks = Some(sinks);
        self
    }

    /// Sets the chat store.
    #[inline]
    #[must_use]
    pub fn chats(mut self, chats: Arc<dyn ChatStore>) -> Self {
        self.chats = Some(chats);
        self
    }

    /// Sets the import pipeline.
    #[inline]
    #[must_use]
    pub fn imports(mut self, imports: Arc<dyn ImportPipeline>) -> Self {
        self.imports = Some(imports);
        self
    }

    /// Sets the metrics sink.
    #[inline]
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Sets the mission API.
    #[inline]
    #[must_use]
    pub fn missions(mut self, missions: Arc<dyn MissionApi>) -> Self {
        self.missions = Some(missions);
        self
    }

    /// Shares an existing viewer registry.
    ///
    /// A fresh registry is created when unset.
    #[inline]
    #[must_use]
    pub fn viewers(mut self, viewers: Arc<ViewerRegistry>) -> Self {
        self.viewers = Some(viewers);
        self
    }

    /// Builds the pool with validation.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if options or any collaborator other than the
    /// viewer registry is not set.
    pub fn build(self) -> Result<ConnectionPool> {
        let options = required(self.options, "Pool options", "options")?;
        let connector = required(self.connector, "Protocol connector", "connector")?;
        let store = required(self.store, "Configuration store", "store")?;
        let sinks = required(self.sinks, "Sink layer", "sinks")?;
        let chats = required(self.chats, "Chat store", "chats")?;
        let imports = required(self.imports, "Import pipeline", "imports")?;
        let metrics = required(self.metrics, "Metrics sink", "metrics")?;
        let missions = required(self.missions, "Mission API", "missions")?;
        let viewers = self.viewers.unwrap_or_default();

        let router = Arc::new(Router::new(
            options.router_options(),
            viewers,
            sinks,
            chats,
            imports,
        ));
        let context = LifecycleContext::new(&options, router, missions, metrics);

        Ok(ConnectionPool::new(options, connector, store, context))
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Unwraps a required builder slot.
fn required<T>(slot: Option<T>, what: &str, setter: &str) -> Result<T> {
    slot.ok_or_else(|| {
        Error::config(format!(
            "{what} is required. Use .{setter}() to set it."
        ))
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio_test::{assert_err, assert_ok};

    use crate::testing::{
        FakeConnector, MemoryStore, RecordingChats, RecordingImports, RecordingMetrics,
        RecordingMissions, RecordingSinks,
    };

    fn server() -> Url {
        Url::parse("ssl://tak.example.com:8089").expect("url")
    }

    fn complete() -> PoolBuilder {
        PoolBuilder::new()
            .server_url(server())
            .connector(Arc::new(FakeConnector::default()))
            .store(Arc::new(MemoryStore::default()))
            .sinks(Arc::new(RecordingSinks::default()))
            .chats(Arc::new(RecordingChats::default()))
            .imports(Arc::new(RecordingImports::default()))
            .metrics(Arc::new(RecordingMetrics::default()))
            .missions(Arc::new(RecordingMissions::default()))
    }

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = PoolBuilder::new();
        assert!(builder.options.is_none());
        assert!(builder.connector.is_none());
        assert!(builder.viewers.is_none());
    }

    #[test]
    fn test_server_url_keeps_other_options() {
        let builder = PoolBuilder::new()
            .options(PoolOptions::new(server()).with_stack_name("prod"))
            .server_url(Url::parse("ssl://other:8089").expect("url"));
        let options = builder.options.expect("options");
        assert_eq!(options.stack_name, "prod");
        assert_eq!(options.server_url.host_str(), Some("other"));
    }

    #[test]
    fn test_build_requires_options() {
        let mut builder = complete();
        builder.options = None;
        let err = assert_err!(builder.build());
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains(".options()"));
    }

    #[test]
    fn test_build_requires_connector() {
        let mut builder = complete();
        builder.connector = None;
        let err = assert_err!(builder.build());
        assert!(err.to_string().contains("connector"));
    }

    #[test]
    fn test_build_shares_viewer_registry() {
        let viewers = Arc::new(ViewerRegistry::new());
        let pool = assert_ok!(complete().viewers(Arc::clone(&viewers)).build());
        assert!(Arc::ptr_eq(pool.viewers(), &viewers));
        assert!(pool.is_empty());
    }
}
