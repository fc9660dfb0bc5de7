//! Per-connection driver task.
//!
//! Each pooled connection gets one task that consumes its signal channel
//! in order, applies the lifecycle transition and performs the resulting
//! action. The task, its backoff waits and its handshake all stop when the
//! connection client is shut down.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::connection::{ConnectionClient, LifecycleAction, RetryPolicy, retry, subscribe_all};
use crate::error::Error;
use crate::protocol::Signal;
use crate::router::Router;
use crate::services::{MetricsSink, MissionApi};

use super::options::PoolOptions;

// ============================================================================
// LifecycleContext
// ============================================================================

/// Shared dependencies of every driver task.
pub(crate) struct LifecycleContext {
    /// Event router.
    pub router: Arc<Router>,
    /// Mission API for the handshake.
    pub missions: Arc<dyn MissionApi>,
    /// Heartbeat metrics.
    pub metrics: Arc<dyn MetricsSink>,
    /// Reconnect backoff.
    pub retry: RetryPolicy,
    /// Wait before retrying a refused subscription.
    pub subscribe_retry_delay: Duration,
    /// Post heartbeats on ping.
    pub heartbeats_enabled: bool,
}

impl LifecycleContext {
    /// Creates the context from pool options.
    pub(crate) fn new(
        options: &PoolOptions,
        router: Arc<Router>,
        missions: Arc<dyn MissionApi>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            router,
            missions,
            metrics,
            retry: options.retry,
            subscribe_retry_delay: options.subscribe_retry_delay,
            heartbeats_enabled: options.heartbeats_enabled(),
        }
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Spawns the driver task for `client`.
pub(crate) fn spawn_driver(
    context: Arc<LifecycleContext>,
    client: Arc<ConnectionClient>,
    signals: mpsc::UnboundedReceiver<Signal>,
) -> JoinHandle<()> {
    tokio::spawn(drive(context, client, signals))
}

/// Consumes signals until the client is shut down or the stream ends.
async fn drive(
    context: Arc<LifecycleContext>,
    client: Arc<ConnectionClient>,
    mut signals: mpsc::UnboundedReceiver<Signal>,
) {
    debug!(connection_id = %client.id(), "Driver started");

    loop {
        let signal = tokio::select! {
            biased;
            () = client.cancel_token().cancelled() => break,
            signal = signals.recv() => match signal {
                Some(signal) => signal,
                None => {
                    debug!(connection_id = %client.id(), "Signal stream ended");
                    break;
                }
            },
        };

        context.handle(&client, signal).await;
    }

    debug!(connection_id = %client.id(), "Driver terminated");
}

// ============================================================================
// Signal Handling
// ============================================================================

impl LifecycleContext {
    /// Applies one signal to `client` and performs the resulting action.
    pub(crate) async fn handle(&self, client: &Arc<ConnectionClient>, signal: Signal) {
        let kind = signal.kind();

        match (client.apply(kind), signal) {
            (LifecycleAction::Route, Signal::Event(event)) => {
                self.router
                    .route(client.config(), std::slice::from_ref(&event), client.is_ephemeral())
                    .await;
            }
            (LifecycleAction::Handshake, _) => self.spawn_handshake(client),
            (LifecycleAction::Retry, signal) => {
                let cause = match signal {
                    Signal::Error(message) => Error::transport(client.id().clone(), message),
                    _ => Error::transport(client.id().clone(), format!("stream {kind}")),
                };
                warn!(
                    connection_id = %client.id(),
                    name = %client.config().name,
                    error = %cause,
                    "Connection lost"
                );
                retry(client, self.retry).await;
            }
            (LifecycleAction::Heartbeat, _) => self.spawn_heartbeat(client),
            (action, _) => debug!(?action, signal = %kind, "Unexpected lifecycle action"),
        }
    }

    /// Runs the mission handshake as a child task of the client.
    fn spawn_handshake(&self, client: &Arc<ConnectionClient>) {
        let token = client.cancel_token().child_token();
        let config = Arc::clone(client.config());
        let missions = Arc::clone(&self.missions);
        let delay = self.subscribe_retry_delay;

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!(connection_id = %config.id, "Handshake cancelled");
                }
                report = subscribe_all(&config, missions.as_ref(), delay) => {
                    info!(
                        connection_id = %config.id,
                        subscribed = report.subscribed.len(),
                        abandoned = report.abandoned.len(),
                        "Handshake complete"
                    );
                }
            }
        });
    }

    /// Posts a heartbeat for persisted, numeric connections.
    ///
    /// Runs as a child task of the client so a slow metrics sink never
    /// holds up the signals queued behind the ping.
    fn spawn_heartbeat(&self, client: &ConnectionClient) {
        if !self.heartbeats_enabled || client.is_ephemeral() {
            return;
        }
        let Some(id) = client.id().as_numeric() else {
            return;
        };

        let token = client.cancel_token().child_token();
        let metrics = Arc::clone(&self.metrics);

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!(connection_id = id, "Heartbeat cancelled");
                }
                result = metrics.post(id) => {
                    if let Err(e) = result {
                        warn!(connection_id = id, error = %e, "Failed to push metrics");
                    }
                }
            }
        });
    }
}
