//! Axum glue for the echo responder.
//!
//! There are no routes: every method and path lands on the fallback handler,
//! which converts the axum request into an [`InboundRequest`], hands it to the
//! [`EchoResponder`] and writes the resulting [`OutboundResponse`] back.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::Response,
    Router,
};
use echo_protocol::{HeaderList, InboundRequest, OutboundResponse};
use echo_runtime::EchoResponder;
use tracing::warn;

/// Default request body limit (16 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Listener-side options for the echo router.
#[derive(Debug, Clone)]
pub struct EchoRouterConfig {
    /// Bodies larger than this are rejected by axum with 413
    pub max_body_bytes: usize,
}

impl Default for EchoRouterConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Build a router that echoes every request through `responder`.
pub fn echo_router(responder: EchoResponder, config: EchoRouterConfig) -> Router {
    Router::new()
        .fallback(handle_echo)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .with_state(Arc::new(responder))
}

async fn handle_echo(
    State(responder): State<Arc<EchoResponder>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = inbound_request(&method, &uri, &headers, body);
    into_axum_response(responder.handle(&request))
}

/// Convert listener request parts into an [`InboundRequest`].
///
/// Header values that are not valid UTF-8 are decoded lossily.
pub fn inbound_request(method: &Method, uri: &Uri, headers: &HeaderMap, body: Bytes) -> InboundRequest {
    let header_list: HeaderList = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    InboundRequest::new(method.as_str(), uri.to_string(), header_list, body.to_vec())
}

/// Convert an [`OutboundResponse`] into an axum response.
///
/// Headers that are not valid HTTP header names or values are dropped.
pub fn into_axum_response(response: OutboundResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut out = Response::new(Body::from(response.body));
    *out.status_mut() = status;

    for (name, value) in response.headers.iter() {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                out.headers_mut().append(name, value);
            }
            _ => warn!(header = %name, "Dropping invalid response header"),
        }
    }

    out
}
