//! Echo responder runtime
//!
//! This crate turns an [`InboundRequest`] into the JSON echo
//! [`OutboundResponse`] and reports each request to an access-log sink.

pub mod responder;
pub mod sink;

pub use responder::{access_log_line, EchoResponder};
pub use sink::{LogSink, MemorySink, StdoutSink};

pub use echo_protocol::{EchoPayload, HeaderList, InboundRequest, OutboundResponse};

