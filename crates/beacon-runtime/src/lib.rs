//! # Beacon Runtime
//!
//! Server runtime and lifecycle management with:
//! - Static file endpoint for the site root
//! - Request handling through the site middleware chain
//! - Server lifecycle (startup, running, shutdown)
//! - Graceful shutdown with signal handling

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod handler;
pub mod server;
pub mod shutdown;
pub mod static_files;

pub use handler::RequestHandler;
pub use server::{Server, ServerBuilder};
pub use shutdown::{ShutdownSignal, SignalHandler};
pub use static_files::StaticFiles;

/// Runtime state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    /// Server is initializing
    Initializing,
    /// Server is running
    Running,
    /// Server is shutting down
    ShuttingDown,
    /// Server is stopped
    Stopped,
}

/// Re-export commonly used types
pub mod prelude {
    pub use crate::server::{Server, ServerBuilder};
    pub use crate::shutdown::{ShutdownSignal, SignalHandler};
    pub use crate::RuntimeState;
}
