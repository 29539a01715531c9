//! Adapter for hosts that hand over a complete request and expect a complete
//! response (serverless handlers and similar).
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, StatusCode};

use super::{apply_cors, apply_preflight_cors, classify, parse_inbound_body, Intake};
use crate::error::{format_error, ProxyError};
use crate::routing::dispatch::{InboundRequest, UniformResult};
use crate::state::AppState;

pub(crate) const STREAMING_UNSUPPORTED_MESSAGE: &str =
    "Streaming is not supported by this transport";

/// A fully materialized response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl BufferedResponse {
    fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    fn json(status: StatusCode, body: &serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            status,
            headers,
            body: Bytes::from(body.to_string()),
        }
    }

    fn error(err: &ProxyError) -> Self {
        let (status, body) = format_error(err);
        Self::json(status, &body)
    }

    /// Body parsed as JSON, for hosts that want a value rather than bytes.
    #[must_use]
    pub fn json_body(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Handle a complete request without streaming.
///
/// Streaming results cannot be represented here; they are answered with a
/// 400 `unsupported_operation` error and the upstream response is dropped.
pub async fn handle_buffered(
    state: &AppState,
    method: Method,
    path: &str,
    headers: HeaderMap,
    body: &[u8],
) -> BufferedResponse {
    let mut response = match classify(&method, path) {
        Intake::Preflight => {
            let mut response = BufferedResponse::empty(StatusCode::NO_CONTENT);
            apply_preflight_cors(&mut response.headers);
            response
        }
        Intake::NoContent => BufferedResponse::empty(StatusCode::NO_CONTENT),
        Intake::Reject(err) => BufferedResponse::error(&err),
        Intake::Dispatch if body.len() > state.max_body_bytes() => BufferedResponse::json(
            StatusCode::PAYLOAD_TOO_LARGE,
            &super::payload_too_large_body(),
        ),
        Intake::Dispatch => match parse_inbound_body(body) {
            Err(err) => BufferedResponse::error(&err),
            Ok(body) => {
                let inbound = InboundRequest::new(method, path, headers, body);
                into_buffered(state.dispatcher.handle(&inbound).await)
            }
        },
    };
    apply_cors(&mut response.headers);
    response
}

/// Convert a dispatcher result into a buffered response.
#[must_use]
pub fn into_buffered(result: UniformResult) -> BufferedResponse {
    match result {
        UniformResult::Immediate {
            status,
            headers,
            body,
        } => BufferedResponse {
            status,
            headers,
            body: Bytes::from(body.to_string()),
        },
        UniformResult::Streaming { producer, .. } => {
            drop(producer);
            tracing::debug!("streaming result rejected by buffered transport");
            BufferedResponse::error(&ProxyError::UnsupportedOperation(
                STREAMING_UNSUPPORTED_MESSAGE.to_string(),
            ))
        }
    }
}
