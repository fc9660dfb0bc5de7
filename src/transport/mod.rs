//! WebSocket transport for live viewers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Router         │                              │  Browser        │
//! │                 │         WebSocket            │                 │
//! │  ViewerRegistry │─────────────────────────────►│  Map client     │
//! │  → WebSocket-   │   /?connection=<id>          │                 │
//! │    Viewer       │    &format=<geojson|raw>     │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Viewer Lifecycle
//!
//! 1. `ViewerServer::bind` - Bind and start accepting
//! 2. Upgrade request is validated and parsed into a `ViewerQuery`
//! 3. `WebSocketViewer` registered for the requested connection
//! 4. Socket close (or server shutdown) unregisters it
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `server` | Viewer server binding and acceptance |
//! | `websocket` | Viewer socket and event loop |

// ============================================================================
// Submodules
// ============================================================================

/// Viewer server.
pub mod server;

/// Viewer socket and event loop.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use server::{ViewerQuery, ViewerServer};
pub use websocket::{VIEWER_QUEUE_CAPACITY, WebSocketViewer};
