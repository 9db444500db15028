//! HTTP listener integration for the echo responder
//!
//! This crate binds the [`echo_runtime::EchoResponder`] to an axum listener
//! and wraps the listener in [`EchoServer`], which tracks whether the server
//! is running and guards against invalid start/stop transitions.

pub mod echo_router;
pub mod errors;
pub mod http_server;

pub use echo_router::{echo_router, EchoRouterConfig};
pub use errors::ServerError;
pub use http_server::{EchoServer, ServerConfig, ServerState};

/// Result type for server lifecycle operations
pub type Result<T> = std::result::Result<T, ServerError>;
