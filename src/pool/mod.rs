//! Connection pool.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`PoolBuilder`] fluent construction |
//! | `core` | [`ConnectionPool`] registry and operations |
//! | `lifecycle` | Per-connection driver task |
//! | `options` | [`PoolOptions`] system switches |

// ============================================================================
// Submodules
// ============================================================================

/// Pool builder.
pub mod builder;

/// Pool implementation.
pub mod core;

/// Per-connection driver task.
mod lifecycle;

/// Pool configuration.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::PoolBuilder;
pub use core::{ConnectionPool, ConnectionStatus};
pub use options::{DEFAULT_STACK_NAME, PoolOptions, TEST_STACK_NAME};
