//! Echo protocol types
//!
//! This crate defines the request and response shapes exchanged between the
//! HTTP listener and the echo responder, plus the JSON payload written back
//! to clients.

pub mod errors;
pub mod message;
pub mod payload;

pub use errors::ProtocolError;
pub use message::{HeaderList, InboundRequest, OutboundResponse};
pub use payload::EchoPayload;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Content type of every echo response body
pub const JSON_CONTENT_TYPE: &str = "application/json";
