//! WebSocket server for live viewers.
//!
//! # Connection Flow
//!
//! 1. Client opens `ws://host:port/?connection=<id>&format=<geojson|raw>`
//! 2. The query is validated during the upgrade; a bad query gets `400`
//! 3. A [`WebSocketViewer`] is registered for the connection id
//! 4. The viewer is unregistered when its socket closes

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{StatusCode, Uri};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::form_urlencoded;

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::router::{ViewerFormat, ViewerRegistry};

use super::websocket::WebSocketViewer;

// ============================================================================
// ViewerQuery
// ============================================================================

/// Parameters of a viewer upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerQuery {
    /// Connection to watch.
    pub connection: ConnectionId,
    /// Requested payload form.
    pub format: ViewerFormat,
}

impl ViewerQuery {
    /// Parses the query string of an upgrade URI.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if `connection` is missing or `format` is unknown.
    pub fn from_uri(uri: &Uri) -> Result<Self> {
        let mut connection = None;
        let mut format = ViewerFormat::default();

        for (key, value) in form_urlencoded::parse(uri.query().unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                "connection" if !value.is_empty() => {
                    connection = Some(ConnectionId::parse(&value));
                }
                "format" => format = value.parse()?,
                _ => {}
            }
        }

        let connection =
            connection.ok_or_else(|| Error::config("Missing connection query parameter"))?;

        Ok(Self { connection, format })
    }
}

// ============================================================================
// ViewerServer
// ============================================================================

/// Accepts viewer sockets and registers them with a [`ViewerRegistry`].
///
/// # Example
///
/// ```ignore
/// use std::net::{IpAddr, Ipv4Addr};
/// use cot_relay::transport::ViewerServer;
///
/// let server = ViewerServer::bind(
///     IpAddr::V4(Ipv4Addr::LOCALHOST),
///     0,
///     pool.viewers().clone(),
/// )
/// .await?;
/// println!("viewers at {}", server.ws_url());
/// ```
pub struct ViewerServer {
    /// Port the server is bound to.
    port: u16,
    /// Bound address.
    ip: IpAddr,
    /// Stops the accept loop and every viewer.
    shutdown: CancellationToken,
}

impl ViewerServer {
    /// Binds the server and starts the accept loop.
    ///
    /// Use port 0 to let the OS assign a random available port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(ip: IpAddr, port: u16, viewers: Arc<ViewerRegistry>) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let actual_port = listener.local_addr()?.port();
        let shutdown = CancellationToken::new();

        tokio::spawn(accept_loop(listener, viewers, shutdown.clone()));

        info!(port = actual_port, "Viewer server started");

        Ok(Self {
            port: actual_port,
            ip,
            shutdown,
        })
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the local socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    /// Returns the base WebSocket URL.
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.local_addr())
    }

    /// Stops accepting and closes every viewer socket.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        info!(port = self.port, "Viewer server shutting down");
    }
}

impl Drop for ViewerServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// ============================================================================
// Accept Loop
// ============================================================================

/// Background task that accepts new viewer sockets.
async fn accept_loop(
    listener: TcpListener,
    viewers: Arc<ViewerRegistry>,
    shutdown: CancellationToken,
) {
    debug!("Accept loop started");

    loop {
        tokio::select! {
            biased;

            () = shutdown.cancelled() => break,

            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let viewers = Arc::clone(&viewers);
                    let cancel = shutdown.child_token();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, viewers, cancel).await {
                            warn!(error = %e, ?addr, "Viewer connection failed");
                        }
                    });
                }
                Err(e) => error!(error = %e, "Accept failed"),
            },
        }
    }

    debug!("Accept loop terminated");
}

/// Upgrades one socket and serves it until it closes.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    viewers: Arc<ViewerRegistry>,
    cancel: CancellationToken,
) -> Result<()> {
    debug!(?addr, "New TCP connection");

    let parsed: Arc<Mutex<Option<ViewerQuery>>> = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&parsed);

    let ws_stream = tokio_tungstenite::accept_hdr_async(
        stream,
        move |request: &Request, response: Response| -> std::result::Result<Response, ErrorResponse> {
            match ViewerQuery::from_uri(request.uri()) {
                Ok(query) => {
                    *slot.lock() = Some(query);
                    Ok(response)
                }
                Err(e) => Err(bad_request(&e)),
            }
        },
    )
    .await?;

    let query = parsed.lock().take().ok_or(Error::ConnectionClosed)?;
    let (viewer, task) = WebSocketViewer::spawn(ws_stream, query.format, cancel);
    let viewer_id = viewers.register(query.connection.clone(), Arc::new(viewer));

    info!(
        ?addr,
        connection_id = %query.connection,
        viewer_id = %viewer_id,
        format = %query.format,
        "Viewer attached"
    );

    if let Err(e) = task.await {
        error!(error = %e, "Viewer task panicked");
    }

    viewers.unregister(&query.connection, viewer_id);
    info!(?addr, connection_id = %query.connection, viewer_id = %viewer_id, "Viewer detached");

    Ok(())
}

/// Builds the rejection sent for an invalid upgrade request.
fn bad_request(error: &Error) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(error.to_string()));
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::Ipv4Addr;

    use futures_util::StreamExt;
    use serde_json::{Value, json};

    use crate::router::Envelope;
    use crate::testing::wait_until;

    fn uri(text: &str) -> Uri {
        text.parse().expect("uri")
    }

    async fn server() -> (ViewerServer, Arc<ViewerRegistry>) {
        let viewers = Arc::new(ViewerRegistry::new());
        let server = ViewerServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0, Arc::clone(&viewers))
            .await
            .expect("bind should succeed");
        (server, viewers)
    }

    #[test]
    fn test_query_numeric_connection() {
        let query = ViewerQuery::from_uri(&uri("/?connection=12&format=raw")).expect("query");
        assert_eq!(query.connection, ConnectionId::from(12));
        assert_eq!(query.format, ViewerFormat::Raw);
    }

    #[test]
    fn test_query_defaults_to_geojson() {
        let query = ViewerQuery::from_uri(&uri("/?connection=alice")).expect("query");
        assert_eq!(query.connection, ConnectionId::from("alice"));
        assert_eq!(query.format, ViewerFormat::Feature);
    }

    #[test]
    fn test_query_rejects_missing_or_bad_values() {
        assert!(ViewerQuery::from_uri(&uri("/")).is_err());
        assert!(ViewerQuery::from_uri(&uri("/?connection=")).is_err());
        assert!(ViewerQuery::from_uri(&uri("/?connection=1&format=xml")).is_err());
    }

    #[tokio::test]
    async fn test_server_bind_random_port() {
        let (server, _) = server().await;
        assert!(server.port() > 0);
        assert_eq!(server.ws_url(), format!("ws://127.0.0.1:{}", server.port()));
    }

    #[tokio::test]
    async fn test_viewer_lifecycle() {
        let (server, viewers) = server().await;
        let url = format!("{}/?connection=7&format=raw", server.ws_url());

        let (mut client, _) = tokio_tungstenite::connect_async(url).await.expect("connect");
        let id = ConnectionId::from(7);
        assert!(wait_until(|| viewers.count(&id) == 1).await);

        let envelope = Envelope::raw(id.clone(), json!({ "event": { "uid": "x" } }));
        for viewer in viewers.viewers(&id) {
            viewer.send(&envelope).expect("send");
        }

        let frame = client.next().await.expect("frame").expect("message");
        let value: Value = serde_json::from_str(frame.to_text().expect("text")).expect("json");
        assert_eq!(value["type"], "cot");
        assert_eq!(value["data"]["event"]["uid"], "x");

        client.close(None).await.expect("close");
        assert!(wait_until(|| viewers.count(&id) == 0).await);
    }

    #[tokio::test]
    async fn test_bad_query_rejected() {
        let (server, viewers) = server().await;
        let url = format!("{}/?format=raw", server.ws_url());

        assert!(tokio_tungstenite::connect_async(url).await.is_err());
        assert_eq!(viewers.total(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_detaches_viewers() {
        let (server, viewers) = server().await;
        let url = format!("{}/?connection=3", server.ws_url());

        let (_client, _) = tokio_tungstenite::connect_async(url).await.expect("connect");
        assert!(wait_until(|| viewers.total() == 1).await);

        server.shutdown();
        assert!(wait_until(|| viewers.total() == 0).await);
    }
}
