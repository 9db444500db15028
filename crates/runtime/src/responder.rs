//! Echo responder
//!
//! Maps every inbound request to a `200 application/json` response that
//! mirrors the request. Holds no mutable state, so one responder can serve
//! any number of concurrent requests.

use std::sync::Arc;

use chrono::{DateTime, Local};
use echo_protocol::{EchoPayload, InboundRequest, OutboundResponse, JSON_CONTENT_TYPE};
use tracing::{debug, error};

use crate::sink::{LogSink, StdoutSink};

/// Timestamp layout of access-log lines
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Request handler that echoes requests back as JSON.
#[derive(Clone)]
pub struct EchoResponder {
    sink: Arc<dyn LogSink>,
}

impl Default for EchoResponder {
    fn default() -> Self {
        Self::new(Arc::new(StdoutSink))
    }
}

impl std::fmt::Debug for EchoResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EchoResponder").finish_non_exhaustive()
    }
}

impl EchoResponder {
    /// Create a responder that writes access-log lines to `sink`
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// Access the sink this responder logs to
    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }

    /// Handle one request. Never fails; every request gets a response.
    pub fn handle(&self, request: &InboundRequest) -> OutboundResponse {
        let response = build_response(request);

        debug!(
            method = %request.method(),
            uri = %request.uri(),
            body_len = request.body().len(),
            header_count = request.headers().len(),
            status = response.status_code,
            "Echoed request"
        );
        self.sink.write_line(&access_log_line(request, Local::now()));

        response
    }
}

/// Build the echo response for `request` without logging it.
fn build_response(request: &InboundRequest) -> OutboundResponse {
    match EchoPayload::from_request(request).to_pretty_json() {
        Ok(body) => OutboundResponse::new(200, body).with_header("content-type", JSON_CONTENT_TYPE),
        Err(e) => {
            error!(error = %e, uri = %request.uri(), "Failed to encode echo payload");
            OutboundResponse::new(500, format!("Failed to encode echo payload: {}", e))
                .with_header("content-type", "text/plain; charset=utf-8")
        }
    }
}

/// Format the access-log line for `request` received at `at`:
/// `[YYYY-MM-DD HH:MM:SS] METHOD URI - Body: N bytes`
pub fn access_log_line(request: &InboundRequest, at: DateTime<Local>) -> String {
    format!(
        "[{}] {} {} - Body: {} bytes",
        at.format(TIMESTAMP_FORMAT),
        request.method(),
        request.uri(),
        request.body().len()
    )
}
