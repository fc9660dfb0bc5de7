//! Event routing and live viewer fan-out.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`Router`]: classification, side effects, sink forwarding |
//! | `envelope` | Envelope shape sent to viewers |
//! | `viewer` | [`Viewer`] trait and [`ViewerRegistry`] |

// ============================================================================
// Submodules
// ============================================================================

/// Router implementation.
pub mod core;

/// Viewer envelopes.
pub mod envelope;

/// Live viewer registry.
pub mod viewer;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::{Router, RouterOptions};
pub use envelope::{Envelope, EnvelopeData, EnvelopeKind};
pub use viewer::{Viewer, ViewerFormat, ViewerRegistry};
