//! Mission subscription handshake.
//!
//! Runs after every secure connect. Each configured subscription is
//! attempted until it succeeds; an actively refused connection is retried
//! after a fixed delay, any other failure abandons that subscription since
//! the mission may have been deleted server-side.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::services::MissionApi;

use super::config::ConnectionConfig;

// ============================================================================
// Constants
// ============================================================================

/// Default wait before retrying a refused subscription.
pub const DEFAULT_SUBSCRIBE_RETRY_DELAY: Duration = Duration::from_secs(1);

// ============================================================================
// HandshakeReport
// ============================================================================

/// Outcome of one handshake run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeReport {
    /// Missions subscribed successfully.
    pub subscribed: Vec<String>,
    /// Missions abandoned after a non-retryable failure.
    pub abandoned: Vec<String>,
}

// ============================================================================
// Handshake
// ============================================================================

/// Subscribes `config` to each of its missions.
///
/// Loops forever on a mission whose endpoint keeps refusing; callers bound
/// it by cancelling the surrounding task.
pub async fn subscribe_all(
    config: &ConnectionConfig,
    missions: &dyn MissionApi,
    retry_delay: Duration,
) -> HandshakeReport {
    let mut report = HandshakeReport::default();

    let auth = match config.require_auth() {
        Ok(auth) => auth,
        Err(e) => {
            warn!(connection_id = %config.id, error = %e, "Skipping mission subscriptions");
            report.abandoned = config.subscriptions.iter().map(|s| s.name.clone()).collect();
            return report;
        }
    };

    let uid = config.uid();

    for sub in &config.subscriptions {
        loop {
            match missions
                .subscribe(auth, &sub.name, &uid, sub.token.as_deref())
                .await
            {
                Ok(()) => {
                    info!(connection_id = %config.id, mission = %sub.name, "Subscribed");
                    report.subscribed.push(sub.name.clone());
                    break;
                }
                Err(e) if e.is_connection_refused() => {
                    warn!(
                        connection_id = %config.id,
                        uid = %uid,
                        mission = %sub.name,
                        error = %e,
                        "Subscription refused, retrying"
                    );
                    sleep(retry_delay).await;
                }
                Err(e) => {
                    warn!(
                        connection_id = %config.id,
                        uid = %uid,
                        mission = %sub.name,
                        error = %e,
                        "Subscription failed, abandoning"
                    );
                    report.abandoned.push(sub.name.clone());
                    break;
                }
            }
        }
    }

    report
}

// ============================================================================
// Tests
// ============================================================================
