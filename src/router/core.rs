//! Event router.
//!
//! Routes each batch of CoT events received on (or re-submitted for) a
//! connection to its consumers:
//!
//! 1. Ephemeral chat events → [`ChatStore`]
//! 2. Ephemeral file shares → [`ImportPipeline`]
//! 3. Every event → each live viewer of the connection
//! 4. Atom events of non-ephemeral batches → [`SinkLayer`]
//!
//! Steps 1–3 run per event, in order; step 4 runs once after the batch.
//! A failure in one side effect or one viewer never affects the others.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::{error, trace, warn};
use url::Url;
use uuid::Uuid;

use crate::connection::ConnectionConfig;
use crate::error::Result;
use crate::identifiers::ConnectionId;
use crate::protocol::{ChatPayload, CotEvent, Feature, FileSharePayload};
use crate::services::{ChatRecord, ChatStore, ImportJob, ImportMode, ImportPipeline, SinkLayer};

use super::envelope::Envelope;
use super::viewer::{ViewerFormat, ViewerRegistry};

// ============================================================================
// RouterOptions
// ============================================================================

/// Router switches, passed by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterOptions {
    /// Forward atom events to the sink layer.
    pub sinks_enabled: bool,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            sinks_enabled: true,
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// Classifies events and fans them out to consumers.
pub struct Router {
    /// Router switches.
    options: RouterOptions,
    /// Live viewers.
    viewers: Arc<ViewerRegistry>,
    /// Durable sinks.
    sinks: Arc<dyn SinkLayer>,
    /// Chat persistence.
    chats: Arc<dyn ChatStore>,
    /// File import pipeline.
    imports: Arc<dyn ImportPipeline>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("options", &self.options)
            .field("viewers", &self.viewers)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Creates a router.
    #[must_use]
    pub fn new(
        options: RouterOptions,
        viewers: Arc<ViewerRegistry>,
        sinks: Arc<dyn SinkLayer>,
        chats: Arc<dyn ChatStore>,
        imports: Arc<dyn ImportPipeline>,
    ) -> Self {
        Self {
            options,
            viewers,
            sinks,
            chats,
            imports,
        }
    }

    /// Returns the router options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> RouterOptions {
        self.options
    }

    /// Returns the viewer registry.
    #[inline]
    #[must_use]
    pub fn viewers(&self) -> &Arc<ViewerRegistry> {
        &self.viewers
    }

    /// Routes a batch of events for `config`.
    ///
    /// Never fails: anything escaping the isolated steps is logged here so it
    /// cannot reach the protocol client's event loop.
    pub async fn route(&self, config: &ConnectionConfig, events: &[CotEvent], ephemeral: bool) {
        if let Err(e) = self.try_route(config, events, ephemeral).await {
            error!(connection_id = %config.id, error = %e, "Failed to route events");
        }
    }

    async fn try_route(
        &self,
        config: &ConnectionConfig,
        events: &[CotEvent],
        ephemeral: bool,
    ) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        for event in events {
            let feature = event.feature();

            if ephemeral {
                self.persist(&config.id, feature).await;
            }

            self.fan_out(&config.id, event);
        }

        if !ephemeral && self.options.sinks_enabled {
            let atoms: Vec<CotEvent> = events.iter().filter(|e| e.is_atom()).cloned().collect();
            if !atoms.is_empty() {
                trace!(connection_id = %config.id, count = atoms.len(), "Forwarding atoms to sinks");
                self.sinks.forward(config, &atoms).await?;
            }
        }

        Ok(())
    }

    /// Persists the chat or file share carried by an ephemeral event.
    async fn persist(&self, id: &ConnectionId, feature: &Feature) {
        let result = if let Some(chat) = feature.chat() {
            self.chats.record(chat_record(id, feature, chat)).await
        } else if let Some(share) = feature.fileshare() {
            match import_job(id, share) {
                Ok(job) => self.imports.submit(job).await,
                Err(e) => Err(e),
            }
        } else {
            return;
        };

        if let Err(e) = result {
            warn!(connection_id = %id, uid = %feature.id, error = %e, "Failed to save CoT");
        }
    }

    /// Sends one event to every viewer of the connection.
    fn fan_out(&self, id: &ConnectionId, event: &CotEvent) {
        let viewers = self.viewers.viewers(id);
        if viewers.is_empty() {
            return;
        }

        let mut feature_envelope: Option<Envelope> = None;
        let mut raw_envelope: Option<Envelope> = None;

        for viewer in &viewers {
            let envelope = match viewer.format() {
                ViewerFormat::Feature => feature_envelope
                    .get_or_insert_with(|| Envelope::feature(id.clone(), event.feature().clone())),
                ViewerFormat::Raw => raw_envelope
                    .get_or_insert_with(|| Envelope::raw(id.clone(), event.raw().clone())),
            };

            if let Err(e) = viewer.send(envelope) {
                warn!(connection_id = %id, format = %viewer.format(), error = %e, "Viewer send failed");
            }
        }
    }
}

// ============================================================================
// Side Effect Builders
// ============================================================================

/// Builds the chat record for an ephemeral chat event.
fn chat_record(id: &ConnectionId, feature: &Feature, chat: &ChatPayload) -> ChatRecord {
    ChatRecord {
        username: id.to_string(),
        chatroom: chat.sender_callsign.clone(),
        sender_callsign: chat.sender_callsign.clone(),
        sender_uid: chat.sender_uid.clone(),
        message_id: chat
            .message_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        message: feature.properties.remarks.clone().unwrap_or_default(),
    }
}

/// Builds the import job for an ephemeral file share.
fn import_job(id: &ConnectionId, share: &FileSharePayload) -> Result<ImportJob> {
    let url = Url::parse(&share.sender_url)?;
    let mode_id = url
        .query_pairs()
        .find(|(key, _)| key == "hash")
        .map(|(_, value)| value.into_owned());

    Ok(ImportJob {
        username: id.to_string(),
        name: share.name.clone(),
        mode: ImportMode::Package,
        mode_id,
    })
}

// ============================================================================
// Tests
// ============================================================================
