//! WebSocket viewer and its event loop.
//!
//! # Event Loop
//!
//! Each viewer spawns a tokio task that handles:
//!
//! - Outgoing envelopes queued by the router
//! - Close frames and errors from the remote end
//! - Server shutdown
//!
//! [`Viewer::send`] never blocks the router; it only queues the serialized
//! envelope for the task. The queue holds at most
//! [`VIEWER_QUEUE_CAPACITY`] envelopes; a viewer that falls further behind
//! misses envelopes instead of growing the queue.

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::router::{Envelope, Viewer, ViewerFormat};

// ============================================================================
// Constants
// ============================================================================

/// Envelopes queued per viewer before new ones are dropped.
pub const VIEWER_QUEUE_CAPACITY: usize = 256;

// ============================================================================
// WebSocketViewer
// ============================================================================

/// A viewer attached over WebSocket.
///
/// `WebSocketViewer` is `Send + Sync`; the router holds it through
/// [`ViewerRegistry`](crate::router::ViewerRegistry).
pub struct WebSocketViewer {
    /// Requested payload form.
    format: ViewerFormat,
    /// Serialized envelopes waiting to be written.
    frame_tx: mpsc::Sender<String>,
}

impl WebSocketViewer {
    /// Wraps an upgraded stream and spawns its event loop.
    ///
    /// The returned handle completes when the socket closes or `cancel`
    /// fires.
    pub fn spawn<S>(
        ws_stream: WebSocketStream<S>,
        format: ViewerFormat,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (frame_tx, frame_rx) = mpsc::channel(VIEWER_QUEUE_CAPACITY);
        let task = tokio::spawn(Self::run_event_loop(ws_stream, frame_rx, cancel));
        (Self { format, frame_tx }, task)
    }

    /// Returns `true` once the event loop has stopped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.frame_tx.is_closed()
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop<S>(
        ws_stream: WebSocketStream<S>,
        mut frame_rx: mpsc::Receiver<String>,
        cancel: CancellationToken,
    ) where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    debug!("Viewer cancelled");
                    let _ = ws_write.close().await;
                    break;
                }

                frame = frame_rx.recv() => {
                    let Some(text) = frame else {
                        debug!("Viewer dropped");
                        let _ = ws_write.close().await;
                        break;
                    };
                    if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                        warn!(error = %e, "Failed to write to viewer");
                        break;
                    }
                    trace!("Envelope written");
                }

                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by viewer");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Viewers are receive-only
                        Some(Ok(_)) => {}
                    }
                }
            }
        }

        debug!("Viewer event loop terminated");
    }
}

impl Viewer for WebSocketViewer {
    fn format(&self) -> ViewerFormat {
        self.format
    }

    fn send(&self, envelope: &Envelope) -> Result<()> {
        let json = envelope.to_json()?;
        self.frame_tx.try_send(json).map_err(|e| match e {
            TrySendError::Full(_) => Error::side_effect("viewer", "send queue full"),
            TrySendError::Closed(_) => Error::ConnectionClosed,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
