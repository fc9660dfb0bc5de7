//! Connection configuration.
//!
//! A [`ConnectionConfig`] identifies one remote identity: its id, mutual
//! TLS material, and the missions it subscribes to. Persisted
//! configurations arrive as [`ConnectionRecord`] rows from the store;
//! ephemeral ones are built in memory with [`ConnectionConfig::ephemeral`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;

// ============================================================================
// AuthMaterial
// ============================================================================

/// PEM encoded client certificate and private key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthMaterial {
    /// Client certificate (PEM).
    pub cert: String,
    /// Client private key (PEM).
    pub key: String,
}

impl AuthMaterial {
    /// Creates auth material from PEM strings.
    #[inline]
    #[must_use]
    pub fn new(cert: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            cert: cert.into(),
            key: key.into(),
        }
    }

    /// Returns `true` if both certificate and key are present.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.cert.trim().is_empty() && !self.key.trim().is_empty()
    }
}

// Keys never end up in logs.
impl fmt::Debug for AuthMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthMaterial")
            .field("cert_len", &self.cert.len())
            .field("key_len", &self.key.len())
            .finish()
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// A mission the connection subscribes to after connecting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Mission name.
    pub name: String,
    /// Mission access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Subscription {
    /// Creates a subscription without token.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: None,
        }
    }

    /// Sets the access token.
    #[inline]
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

// ============================================================================
// ConnectionConfig
// ============================================================================

/// Configuration of one streaming connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    /// Stable identifier, registry key.
    pub id: ConnectionId,
    /// Human readable name.
    pub name: String,
    /// Device UID presented to the server, defaults to the id.
    pub uid: Option<String>,
    /// Server override; the pool default is used when `None`.
    pub server: Option<Url>,
    /// Mutual TLS material.
    pub auth: Option<AuthMaterial>,
    /// Missions to subscribe to on connect.
    pub subscriptions: Vec<Subscription>,
}

impl ConnectionConfig {
    /// Creates a configuration with auth material and no subscriptions.
    #[must_use]
    pub fn new(id: impl Into<ConnectionId>, name: impl Into<String>, auth: AuthMaterial) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            uid: None,
            server: None,
            auth: Some(auth),
            subscriptions: Vec::new(),
        }
    }

    /// Creates an in-memory configuration for an ephemeral connection.
    ///
    /// Ephemeral configurations are keyed by name and never persisted.
    #[must_use]
    pub fn ephemeral(name: impl Into<String>, auth: AuthMaterial) -> Self {
        let name = name.into();
        Self::new(ConnectionId::Named(name.clone()), name, auth)
    }

    /// Sets the device UID.
    #[inline]
    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Sets a server override.
    #[inline]
    #[must_use]
    pub fn with_server(mut self, server: Url) -> Self {
        self.server = Some(server);
        self
    }

    /// Adds a mission subscription.
    #[inline]
    #[must_use]
    pub fn with_subscription(mut self, subscription: Subscription) -> Self {
        self.subscriptions.push(subscription);
        self
    }

    /// Returns the device UID used for mission subscriptions.
    #[must_use]
    pub fn uid(&self) -> String {
        self.uid.clone().unwrap_or_else(|| self.id.to_string())
    }

    /// Looks up a configured subscription by mission name.
    #[must_use]
    pub fn subscription(&self, name: &str) -> Option<&Subscription> {
        self.subscriptions.iter().find(|sub| sub.name == name)
    }

    /// Returns the auth material, failing if either half is missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] without complete cert and key.
    pub fn require_auth(&self) -> Result<&AuthMaterial> {
        self.auth
            .as_ref()
            .filter(|auth| auth.is_complete())
            .ok_or_else(|| {
                Error::invalid_configuration(
                    self.id.clone(),
                    "Connection must have auth.cert & auth.key",
                )
            })
    }
}

// ============================================================================
// ConnectionRecord
// ============================================================================

/// A persisted connection row as streamed from the configuration store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Row id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Disabled rows are skipped by `init`.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Device UID override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Mutual TLS material.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthMaterial>,
    /// Mission subscriptions.
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
}

/// Rows without an `enabled` column are enabled.
fn default_enabled() -> bool {
    true
}

impl From<ConnectionRecord> for ConnectionConfig {
    fn from(record: ConnectionRecord) -> Self {
        Self {
            id: ConnectionId::Numeric(record.id),
            name: record.name,
            uid: record.uid,
            server: None,
            auth: record.auth,
            subscriptions: record.subscriptions,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
