//! Transport-agnostic request dispatcher.
//!
//! Every host adapter turns its native request into an [`InboundRequest`],
//! calls [`Dispatcher::handle`] and serializes the returned
//! [`UniformResult`] back into its native response type. No error escapes
//! `handle`; failures come back as `Immediate` error bodies.
use std::time::Instant;

use http::header::{HeaderValue, CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode};

use super::Route;
use crate::api::models::model_list;
use crate::auth::require_api_key;
use crate::config::UpstreamConfig;
use crate::error::{format_error, upstream_api_error, ErrorCategory, ProxyError};
use crate::observability::log_request_complete;
use crate::protocol::grok::encoder::encode_grok_request;
use crate::protocol::grok::response_decoder::decode_grok_response;
use crate::protocol::grok::stream::StreamKind;
use crate::stream::{SseProducer, StreamTranscoder};
use crate::transport::{HttpTransport, UpstreamRequest};

/// An inbound call as seen by the dispatcher. Immutable once built.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    route: Route,
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<serde_json::Value>,
}

impl InboundRequest {
    #[must_use]
    pub fn new(
        method: Method,
        path: impl Into<String>,
        headers: HeaderMap,
        body: Option<serde_json::Value>,
    ) -> Self {
        let path = path.into();
        Self {
            route: Route::from_path(&path),
            method,
            path,
            headers,
            body,
        }
    }

    #[must_use]
    pub fn route(&self) -> Route {
        self.route
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    /// Model id echoed back to the caller: the inbound `model` when it is a
    /// non-empty string, `default` otherwise.
    #[must_use]
    pub fn model_echo<'a>(&'a self, default: &'a str) -> &'a str {
        self.body
            .as_ref()
            .and_then(|body| body.get("model"))
            .and_then(serde_json::Value::as_str)
            .filter(|model| !model.is_empty())
            .unwrap_or(default)
    }
}

/// Outcome of one dispatched call. Exactly one variant per request.
#[derive(Debug)]
pub enum UniformResult {
    Immediate {
        status: StatusCode,
        headers: HeaderMap,
        body: serde_json::Value,
    },
    Streaming {
        status: StatusCode,
        headers: HeaderMap,
        producer: SseProducer,
    },
}

impl UniformResult {
    #[must_use]
    pub fn json(status: StatusCode, body: serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        UniformResult::Immediate {
            status,
            headers,
            body,
        }
    }

    #[must_use]
    pub fn from_error(err: &ProxyError) -> Self {
        let (status, body) = format_error(err);
        Self::json(status, body)
    }

    #[must_use]
    pub fn sse(producer: SseProducer) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        UniformResult::Streaming {
            status: StatusCode::OK,
            headers,
            producer,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            UniformResult::Immediate { status, .. } | UniformResult::Streaming { status, .. } => {
                *status
            }
        }
    }
}

/// The single translation pipeline shared by all host adapters.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: UpstreamConfig,
    transport: HttpTransport,
}

impl Dispatcher {
    #[must_use]
    pub fn new(config: UpstreamConfig, transport: HttpTransport) -> Self {
        Self { config, transport }
    }

    /// Build a dispatcher with a transport derived from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Transport`] when the HTTP client cannot be built.
    pub fn from_config(config: UpstreamConfig) -> Result<Self, ProxyError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(config, transport))
    }

    /// Handle one request. Never fails: every error is converted into an
    /// `Immediate` result carrying the `OpenAI` error JSON.
    pub async fn handle(&self, request: &InboundRequest) -> UniformResult {
        let started = Instant::now();
        let result = match self.try_handle(request).await {
            Ok(result) => result,
            Err(err) => {
                if err.category() == ErrorCategory::ServerError {
                    tracing::error!(route = %request.route(), error = %err, "request failed");
                } else {
                    tracing::debug!(route = %request.route(), error = %err, "request rejected");
                }
                UniformResult::from_error(&err)
            }
        };
        log_request_complete(request.route(), result.status(), started);
        result
    }

    async fn try_handle(&self, request: &InboundRequest) -> Result<UniformResult, ProxyError> {
        let api_key = require_api_key(request.headers(), self.config.api_key.as_deref())?;

        let route = request.route();
        match route {
            Route::Models => {
                let body = serde_json::to_value(model_list(&self.config))
                    .map_err(|e| ProxyError::Internal(e.to_string()))?;
                return Ok(UniformResult::json(StatusCode::OK, body));
            }
            Route::Unsupported => {
                return Err(ProxyError::InvalidRequest(format!(
                    "Unsupported endpoint: {}",
                    request.path()
                )));
            }
            Route::ChatCompletions | Route::Completions | Route::Embeddings => {}
        }
        if request.method() != Method::POST {
            return Err(ProxyError::MethodNotAllowed);
        }

        let grok_body = encode_grok_request(route, request.body(), &self.config)?;
        let upstream = UpstreamRequest::for_route(route, &self.config, grok_body, api_key)
            .ok_or_else(|| ProxyError::Internal(format!("route {route} has no upstream path")))?;

        let response = self.transport.send(&upstream).await?;
        let status = response.status();
        if !status.is_success() {
            // Best effort: an unreadable error body still yields a generic message.
            let body = response.bytes().await.unwrap_or_default();
            tracing::warn!(
                route = %route,
                status = status.as_u16(),
                "upstream returned non-success status"
            );
            return Err(upstream_api_error(status, &body));
        }

        let model = request.model_echo(&self.config.default_model);
        if upstream.is_stream() {
            let kind = StreamKind::for_route(route)
                .ok_or_else(|| ProxyError::Internal(format!("route {route} cannot stream")))?;
            let transcoder = StreamTranscoder::new(kind, model);
            return Ok(UniformResult::sse(SseProducer::new(
                response.bytes_stream(),
                transcoder,
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| ProxyError::Transport(err.to_string()))?;
        let body = decode_grok_response(route, &bytes, model)?;
        Ok(UniformResult::json(StatusCode::OK, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: Method, path: &str, body: Option<serde_json::Value>) -> InboundRequest {
        InboundRequest::new(method, path, HeaderMap::new(), body)
    }

    #[test]
    fn inbound_request_derives_route() {
        let req = request(Method::POST, "/v1/chat/completions", None);
        assert_eq!(req.route(), Route::ChatCompletions);
        assert_eq!(req.path(), "/v1/chat/completions");
        assert!(req.body().is_none());
    }

    #[test]
    fn model_echo_falls_back_to_default() {
        let req = request(
            Method::POST,
            "/v1/completions",
            Some(serde_json::json!({ "model": "gpt-4o", "stream": true })),
        );
        assert_eq!(req.model_echo("grok-1"), "gpt-4o");

        let req = request(
            Method::POST,
            "/v1/completions",
            Some(serde_json::json!({ "model": "" })),
        );
        assert_eq!(req.model_echo("grok-1"), "grok-1");
    }

    #[test]
    fn error_result_carries_status_and_json_header() {
        let result = UniformResult::from_error(&ProxyError::NotFound);
        assert_eq!(result.status(), StatusCode::NOT_FOUND);
        let UniformResult::Immediate { headers, body, .. } = result else {
            panic!("expected immediate result");
        };
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(body["error"]["message"], "Not found");
    }

    #[tokio::test]
    async fn missing_key_is_rejected_before_routing() {
        let dispatcher = Dispatcher::from_config(UpstreamConfig::default()).unwrap();
        let result = dispatcher
            .handle(&request(Method::GET, "/v1/models", None))
            .await;
        assert_eq!(result.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn models_are_listed_locally() {
        let config = UpstreamConfig {
            api_key: Some("fallback".to_string()),
            ..UpstreamConfig::default()
        };
        let dispatcher = Dispatcher::from_config(config).unwrap();
        let result = dispatcher
            .handle(&request(Method::GET, "/v1/models", None))
            .await;
        let UniformResult::Immediate { status, body, .. } = result else {
            panic!("expected immediate result");
        };
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["id"], "grok-1");
    }

    #[tokio::test]
    async fn unsupported_route_is_bad_request() {
        let config = UpstreamConfig {
            api_key: Some("fallback".to_string()),
            ..UpstreamConfig::default()
        };
        let dispatcher = Dispatcher::from_config(config).unwrap();
        let result = dispatcher
            .handle(&request(Method::POST, "/v1/images/generations", None))
            .await;
        let UniformResult::Immediate { status, body, .. } = result else {
            panic!("expected immediate result");
        };
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request_error");
        assert_eq!(
            body["error"]["message"],
            "Unsupported endpoint: /v1/images/generations"
        );
    }

    #[tokio::test]
    async fn non_post_to_forwarded_route_is_405() {
        let config = UpstreamConfig {
            api_key: Some("fallback".to_string()),
            ..UpstreamConfig::default()
        };
        let dispatcher = Dispatcher::from_config(config).unwrap();
        let result = dispatcher
            .handle(&request(Method::GET, "/v1/chat/completions", None))
            .await;
        assert_eq!(result.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
