//! Live viewer relay fed from stdin.
//!
//! Demonstrates:
//! - Building a pool with in-process collaborators
//! - Serving live viewers over WebSocket
//! - Re-submitting externally produced CoT through `ConnectionPool::cots`
//!
//! Each stdin line must be a GeoJSON feature. Connect a viewer to the
//! printed URL, then paste features.
//!
//! Usage:
//!   cargo run --example viewer_relay
//!   cargo run --example viewer_relay -- --port 9001 --connection 7
//!   cargo run --example viewer_relay -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use url::Url;

use common::Args;
use cot_relay::{
    AuthMaterial, ChatRecord, ChatStore, ConfigStore, ConnectionConfig, ConnectionId,
    ConnectionPool, ConnectionRecord, CotEvent, Error, Feature, ImportJob, ImportPipeline,
    MetricsSink, MissionApi, PoolOptions, ProtocolConnector, ProtocolSession, Result, SinkLayer,
    ViewerServer,
};

// ============================================================================
// Constants
// ============================================================================

const SERVER_URL: &str = "ssl://localhost:8089";

// ============================================================================
// Collaborators
// ============================================================================

/// No streaming server in this demo; every connect is refused.
struct Offline;

#[async_trait]
impl ProtocolConnector for Offline {
    async fn connect(
        &self,
        id: &ConnectionId,
        _server: &Url,
        _auth: &AuthMaterial,
    ) -> Result<ProtocolSession> {
        Err(Error::connection_refused(format!("{id}: offline demo")))
    }
}

impl ConfigStore for Offline {
    fn connections(&self) -> BoxStream<'_, Result<ConnectionRecord>> {
        stream::empty().boxed()
    }
}

#[async_trait]
impl MissionApi for Offline {
    async fn subscribe(
        &self,
        _auth: &AuthMaterial,
        _mission: &str,
        _uid: &str,
        _token: Option<&str>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Logs every side effect instead of performing it.
struct Log;

#[async_trait]
impl SinkLayer for Log {
    async fn forward(&self, config: &ConnectionConfig, atoms: &[CotEvent]) -> Result<()> {
        info!(connection_id = %config.id, count = atoms.len(), "sink");
        Ok(())
    }
}

#[async_trait]
impl ChatStore for Log {
    async fn record(&self, record: ChatRecord) -> Result<()> {
        info!(chatroom = %record.chatroom, message = %record.message, "chat");
        Ok(())
    }
}

#[async_trait]
impl ImportPipeline for Log {
    async fn submit(&self, job: ImportJob) -> Result<()> {
        info!(name = %job.name, "import");
        Ok(())
    }
}

#[async_trait]
impl MetricsSink for Log {
    async fn post(&self, id: i64) -> Result<()> {
        info!(connection_id = id, "heartbeat");
        Ok(())
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    common::init_logging(args.debug);

    let offline = Arc::new(Offline);
    let log = Arc::new(Log);
    let pool = ConnectionPool::builder()
        .options(PoolOptions::new(Url::parse(SERVER_URL)?).with_metrics(false))
        .connector(offline.clone())
        .store(offline.clone())
        .missions(offline)
        .sinks(log.clone())
        .chats(log.clone())
        .imports(log.clone())
        .metrics(log)
        .build()?;
    pool.init().await?;

    let server = ViewerServer::bind(
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        args.port,
        Arc::clone(pool.viewers()),
    )
    .await?;

    let connection = ConnectionId::parse(&args.connection);
    let config = ConnectionConfig::new(
        connection.clone(),
        "stdin",
        AuthMaterial::new("unused", "unused"),
    );

    println!("Viewer URL: {}/?connection={connection}", server.ws_url());
    println!("Paste one GeoJSON feature per line; Ctrl+D to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let raw: serde_json::Value = serde_json::from_str(&line).context("invalid JSON")?;
        let feature: Feature = serde_json::from_value(raw.clone()).context("not a feature")?;
        pool.cots(&config, &[CotEvent::new(raw, feature)], false).await;
    }

    server.shutdown();
    pool.shutdown();
    Ok(())
}
