//! Pool configuration.
//!
//! System-wide switches that would otherwise be ambient state are
//! collected here and passed by value into the router and retry
//! controller.
//!
//! # Example
//!
//! ```ignore
//! use cot_relay::PoolOptions;
//!
//! let options = PoolOptions::new("ssl://tak.example.com:8089".parse()?)
//!     .with_stack_name("prod")
//!     .with_sinks(false);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::connection::{DEFAULT_SUBSCRIBE_RETRY_DELAY, RetryPolicy};
use crate::router::RouterOptions;

// ============================================================================
// Constants
// ============================================================================

/// Stack name that marks a test deployment; heartbeats are not posted.
pub const TEST_STACK_NAME: &str = "test";

/// Stack name used when none is configured.
pub const DEFAULT_STACK_NAME: &str = "default";

// ============================================================================
// PoolOptions
// ============================================================================

/// Connection pool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolOptions {
    /// Streaming server used when a configuration has no override.
    pub server_url: Url,

    /// Deployment name.
    pub stack_name: String,

    /// Forward atom events to sinks.
    pub sinks_enabled: bool,

    /// Post heartbeat metrics on ping.
    pub metrics_enabled: bool,

    /// Reconnect backoff.
    pub retry: RetryPolicy,

    /// Wait before retrying a refused mission subscription.
    pub subscribe_retry_delay: Duration,
}

// ============================================================================
// Constructors
// ============================================================================

impl PoolOptions {
    /// Creates options for `server_url` with everything else defaulted.
    #[must_use]
    pub fn new(server_url: Url) -> Self {
        Self {
            server_url,
            stack_name: DEFAULT_STACK_NAME.to_string(),
            sinks_enabled: true,
            metrics_enabled: true,
            retry: RetryPolicy::default(),
            subscribe_retry_delay: DEFAULT_SUBSCRIBE_RETRY_DELAY,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl PoolOptions {
    /// Sets the deployment name.
    #[inline]
    #[must_use]
    pub fn with_stack_name(mut self, name: impl Into<String>) -> Self {
        self.stack_name = name.into();
        self
    }

    /// Enables or disables sink forwarding.
    #[inline]
    #[must_use]
    pub fn with_sinks(mut self, enabled: bool) -> Self {
        self.sinks_enabled = enabled;
        self
    }

    /// Enables or disables heartbeat metrics.
    #[inline]
    #[must_use]
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    /// Sets the reconnect backoff.
    #[inline]
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the refused-subscription retry delay.
    #[inline]
    #[must_use]
    pub fn with_subscribe_retry_delay(mut self, delay: Duration) -> Self {
        self.subscribe_retry_delay = delay;
        self
    }
}

// ============================================================================
// Derived Settings
// ============================================================================

impl PoolOptions {
    /// Returns `true` when running as the test stack.
    #[inline]
    #[must_use]
    pub fn is_test_environment(&self) -> bool {
        self.stack_name == TEST_STACK_NAME
    }

    /// Returns `true` if ping signals should post heartbeats.
    #[inline]
    #[must_use]
    pub fn heartbeats_enabled(&self) -> bool {
        self.metrics_enabled && !self.is_test_environment()
    }

    /// Returns the router switches.
    #[inline]
    #[must_use]
    pub fn router_options(&self) -> RouterOptions {
        RouterOptions {
            sinks_enabled: self.sinks_enabled,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
