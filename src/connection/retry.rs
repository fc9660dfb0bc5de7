//! Reconnect backoff.
//!
//! Every `end`, `timeout` or `error` signal lands here. The delay grows
//! linearly with the retry count up to a cap, and the loop never gives
//! up: the server may come back at any time.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::client::ConnectionClient;

// ============================================================================
// RetryPolicy
// ============================================================================

/// Linear backoff with a cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay added per retry.
    pub step: Duration,
    /// Maximum delay.
    pub cap: Duration,
    /// The count stops growing once it exceeds this value.
    pub max_count: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            step: Duration::from_secs(1),
            cap: Duration::from_secs(15),
            max_count: 15,
        }
    }
}

impl RetryPolicy {
    /// Returns the delay before reconnecting at `count`.
    #[inline]
    #[must_use]
    pub fn delay(&self, count: u32) -> Duration {
        self.step.saturating_mul(count).min(self.cap)
    }

    /// Returns the retry count after one more attempt.
    ///
    /// Saturates at `max_count + 1`.
    #[inline]
    #[must_use]
    pub fn next_count(&self, count: u32) -> u32 {
        if count <= self.max_count {
            count.saturating_add(1)
        } else {
            count
        }
    }
}

// ============================================================================
// Retry Controller
// ============================================================================

/// Waits out the backoff delay, then reconnects the client.
///
/// Never fails: reconnect errors resurface as later signals and come back
/// through here. Returns early without reconnecting if the client is shut
/// down during the wait.
///
/// Returns the delay that was scheduled.
pub async fn retry(client: &ConnectionClient, policy: RetryPolicy) -> Duration {
    let (delay, attempt) = client.with_lifecycle(|state| {
        let delay = policy.delay(state.retry_count);
        state.retry_count = policy.next_count(state.retry_count);
        (delay, state.retry_count)
    });

    info!(
        connection_id = %client.id(),
        name = %client.config().name,
        attempt,
        ?delay,
        "Retrying connection"
    );

    tokio::select! {
        biased;
        () = client.cancel_token().cancelled() => {
            debug!(connection_id = %client.id(), "Retry cancelled");
            return delay;
        }
        () = sleep(delay) => {}
    }

    match client.protocol().reconnect().await {
        Ok(()) => {}
        Err(e) if e.is_recoverable() => {
            warn!(connection_id = %client.id(), error = %e, "Reconnect failed");
        }
        Err(e) => {
            error!(connection_id = %client.id(), error = %e, "Reconnect failed with unexpected error");
        }
    }

    delay
}

// ============================================================================
// Tests
// ============================================================================
