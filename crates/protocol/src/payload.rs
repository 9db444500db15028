//! Echo payload written back to clients.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::message::{HeaderList, InboundRequest};
use crate::Result;

/// Indentation used for the pretty-printed response body
const INDENT: &[u8] = b"    ";

/// JSON mirror of an inbound request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EchoPayload {
    /// HTTP method as received
    pub method: String,
    /// Request target (path and query) as received
    pub uri: String,
    /// Headers grouped by name
    pub headers: HeaderList,
    /// Body decoded as UTF-8, invalid sequences replaced with U+FFFD
    pub body: String,
}

impl EchoPayload {
    /// Build a payload copying every field of `request`.
    pub fn from_request(request: &InboundRequest) -> Self {
        Self {
            method: request.method().to_string(),
            uri: request.uri().to_string(),
            headers: request.headers().clone(),
            body: String::from_utf8_lossy(request.body()).into_owned(),
        }
    }

    /// Serialize as pretty-printed JSON. Forward slashes are left unescaped.
    pub fn to_pretty_json(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(256);
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
        self.serialize(&mut serializer)?;
        Ok(buf)
    }
}
