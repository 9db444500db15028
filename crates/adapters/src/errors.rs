//! Server lifecycle errors

use thiserror::Error;

/// Errors raised by [`crate::EchoServer`]
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Server is already running")]
    AlreadyRunning,

    #[error("Failed to bind {address}: {source}")]
    BindFailed {
        address: String,
        source: std::io::Error,
    },

    #[error("Server task failed: {0}")]
    Serve(#[from] std::io::Error),

    #[error("Server task panicked or was cancelled: {0}")]
    Join(#[from] tokio::task::JoinError),
}
