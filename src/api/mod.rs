//! Host adapters over the [`Dispatcher`](crate::routing::dispatch::Dispatcher).
//!
//! The streaming adapter is the hyper/axum service used by the binary. The
//! buffered adapter serves hosts whose response type cannot carry a body
//! stream.
pub mod buffered;
pub(crate) mod models;

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::response::Response;
use futures_util::StreamExt;
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE, CONTENT_TYPE,
};

use crate::error::{format_error, ErrorCategory, ProxyError};
use crate::protocol::error_shapes::openai_error_payload;
use crate::routing::dispatch::{InboundRequest, UniformResult};
use crate::state::AppState;

const API_PATH_PREFIX: &str = "/v1/";
const FAVICON_PATH: &str = "/favicon.ico";
const CORS_ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization, X-API-Key";
const CORS_MAX_AGE_SECS: &str = "86400";

/// What the adapter does before the body is even read.
#[derive(Debug)]
pub(crate) enum Intake {
    /// CORS preflight: 204 with the full CORS header set.
    Preflight,
    /// 204 without a body.
    NoContent,
    /// Rejected outright.
    Reject(ProxyError),
    /// Read the body and hand the request to the dispatcher.
    Dispatch,
}

pub(crate) fn classify(method: &Method, path: &str) -> Intake {
    if method == Method::OPTIONS {
        Intake::Preflight
    } else if path == FAVICON_PATH {
        Intake::NoContent
    } else if !path.starts_with(API_PATH_PREFIX) {
        Intake::Reject(ProxyError::NotFound)
    } else {
        Intake::Dispatch
    }
}

/// Parse an inbound body. An empty body is `None`.
///
/// # Errors
///
/// Returns [`ProxyError::InvalidRequest`] when the bytes are not JSON.
pub(crate) fn parse_inbound_body(bytes: &[u8]) -> Result<Option<serde_json::Value>, ProxyError> {
    if bytes.trim_ascii().is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(bytes)
        .map(Some)
        .map_err(|_| ProxyError::InvalidRequest("Invalid request body".to_string()))
}

pub(crate) fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
}

pub(crate) fn apply_preflight_cors(headers: &mut HeaderMap) {
    apply_cors(headers);
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(CORS_ALLOW_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(CORS_ALLOW_HEADERS),
    );
    headers.insert(
        ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(CORS_MAX_AGE_SECS),
    );
}

pub(crate) fn payload_too_large_body() -> serde_json::Value {
    openai_error_payload(
        ErrorCategory::InvalidRequest,
        "Request body too large",
        None,
    )
}

/// Serve one HTTP request through the dispatcher.
///
/// # Errors
///
/// This function currently never returns `Err` and uses `Infallible`.
pub async fn dispatch_request(
    state: Arc<AppState>,
    request: Request<Body>,
) -> Result<Response, Infallible> {
    let (parts, body) = request.into_parts();

    let mut response = match classify(&parts.method, parts.uri.path()) {
        Intake::Preflight => {
            let mut response = empty_response(StatusCode::NO_CONTENT);
            apply_preflight_cors(response.headers_mut());
            response
        }
        Intake::NoContent => empty_response(StatusCode::NO_CONTENT),
        Intake::Reject(err) => error_response(&err),
        Intake::Dispatch => match read_request_body(body, state.max_body_bytes()).await {
            Err(response) => response,
            Ok(bytes) => match parse_inbound_body(&bytes) {
                Err(err) => error_response(&err),
                Ok(body) => {
                    let inbound = InboundRequest::new(
                        parts.method,
                        parts.uri.path(),
                        parts.headers,
                        body,
                    );
                    into_http_response(state.dispatcher.handle(&inbound).await)
                }
            },
        },
    };

    apply_cors(response.headers_mut());
    Ok(response)
}

async fn read_request_body(body: Body, limit: usize) -> Result<bytes::Bytes, Response> {
    body::to_bytes(body, limit)
        .await
        .map_err(|_| json_response(StatusCode::PAYLOAD_TOO_LARGE, &payload_too_large_body()))
}

fn empty_response(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

fn json_response(status: StatusCode, body: &serde_json::Value) -> Response {
    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn error_response(err: &ProxyError) -> Response {
    let (status, body) = format_error(err);
    json_response(status, &body)
}

/// Serialize a dispatcher result into an HTTP response. Streaming results
/// become a chunked body pulled frame by frame from the producer.
#[must_use]
pub fn into_http_response(result: UniformResult) -> Response {
    match result {
        UniformResult::Immediate {
            status,
            headers,
            body,
        } => {
            let mut response = Response::new(Body::from(body.to_string()));
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            response
        }
        UniformResult::Streaming {
            status,
            headers,
            producer,
        } => {
            let stream = producer.into_stream().map(Ok::<_, Infallible>);
            let mut response = Response::new(Body::from_stream(stream));
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_is_preflight_on_any_path() {
        assert!(matches!(
            classify(&Method::OPTIONS, "/anything"),
            Intake::Preflight
        ));
    }

    #[test]
    fn favicon_is_no_content() {
        assert!(matches!(
            classify(&Method::GET, "/favicon.ico"),
            Intake::NoContent
        ));
    }

    #[test]
    fn non_api_paths_are_not_found() {
        assert!(matches!(
            classify(&Method::GET, "/"),
            Intake::Reject(ProxyError::NotFound)
        ));
        assert!(matches!(
            classify(&Method::POST, "/v2/chat/completions"),
            Intake::Reject(ProxyError::NotFound)
        ));
        assert!(matches!(
            classify(&Method::POST, "/v1/chat/completions"),
            Intake::Dispatch
        ));
    }

    #[test]
    fn body_parsing() {
        assert!(parse_inbound_body(b"").unwrap().is_none());
        assert!(parse_inbound_body(b"  \n").unwrap().is_none());
        assert_eq!(
            parse_inbound_body(br#"{"a":1}"#).unwrap(),
            Some(serde_json::json!({ "a": 1 }))
        );
        assert!(matches!(
            parse_inbound_body(b"{oops"),
            Err(ProxyError::InvalidRequest(_))
        ));
    }

    #[test]
    fn preflight_headers() {
        let mut headers = HeaderMap::new();
        apply_preflight_cors(&mut headers);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS");
        assert_eq!(
            headers[ACCESS_CONTROL_ALLOW_HEADERS],
            "Content-Type, Authorization, X-API-Key"
        );
        assert_eq!(headers[ACCESS_CONTROL_MAX_AGE], "86400");
    }
}
