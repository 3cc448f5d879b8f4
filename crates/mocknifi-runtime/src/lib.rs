//! # mocknifi runtime
//!
//! HTTPS responder and its lifecycle:
//! - `POST /collection` answered with a fixed body
//! - TLS accept loop requiring client certificates
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

pub use handler::{router, COLLECTION_PATH, COLLECTION_RESPONSE};
pub use server::{Server, ServerBuilder};
pub use shutdown::{ShutdownSignal, SignalHandler};

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
