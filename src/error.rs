use std::borrow::Cow;

use crate::protocol::error_shapes::openai_error_payload;
use crate::util::truncate_with_ellipsis;

const UPSTREAM_ERROR_MAX_LEN: usize = 500;
const GENERIC_UPSTREAM_MESSAGE: &str = "Error from Grok API";

/// Error type shared by the mappers, the transport and the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Authentication error: {0}")]
    Authentication(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Upstream error: status={status}, message={message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
    },
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Protocol translation error: {0}")]
    Translation(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Broad error category for status code and error `type` selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidRequest,
    NotFound,
    MethodNotAllowed,
    Authentication,
    Upstream,
    UnsupportedOperation,
    ServerError,
}

impl ProxyError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProxyError::Authentication(_) => ErrorCategory::Authentication,
            ProxyError::InvalidRequest(_) => ErrorCategory::InvalidRequest,
            ProxyError::NotFound => ErrorCategory::NotFound,
            ProxyError::MethodNotAllowed => ErrorCategory::MethodNotAllowed,
            ProxyError::Api { .. } => ErrorCategory::Upstream,
            ProxyError::UnsupportedOperation(_) => ErrorCategory::UnsupportedOperation,
            ProxyError::Transport(_) | ProxyError::Translation(_) | ProxyError::Internal(_) => {
                ErrorCategory::ServerError
            }
        }
    }

    /// HTTP status returned to the caller. Upstream failures forward the
    /// upstream status.
    #[must_use]
    pub fn status(&self) -> http::StatusCode {
        match self {
            ProxyError::Api { status, .. } => {
                http::StatusCode::from_u16(*status).unwrap_or(http::StatusCode::BAD_GATEWAY)
            }
            _ => http_status_for_category(self.category()),
        }
    }

    /// Message placed in the `error.message` field, without the `Display`
    /// prefix used for logs.
    #[must_use]
    pub fn client_message(&self) -> Cow<'_, str> {
        match self {
            ProxyError::Authentication(msg)
            | ProxyError::InvalidRequest(msg)
            | ProxyError::UnsupportedOperation(msg)
            | ProxyError::Transport(msg)
            | ProxyError::Translation(msg)
            | ProxyError::Internal(msg) => Cow::Borrowed(msg.as_str()),
            ProxyError::Api { message, .. } => Cow::Borrowed(message.as_str()),
            ProxyError::NotFound => Cow::Borrowed("Not found"),
            ProxyError::MethodNotAllowed => Cow::Borrowed("Method not allowed"),
        }
    }

    /// Optional `error.code` value.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            ProxyError::Authentication(_) => Some("invalid_api_key"),
            ProxyError::Api { code, .. } => Some(code.as_deref().unwrap_or("unknown_error")),
            _ => None,
        }
    }
}

fn http_status_for_category(cat: ErrorCategory) -> http::StatusCode {
    match cat {
        ErrorCategory::InvalidRequest | ErrorCategory::UnsupportedOperation => {
            http::StatusCode::BAD_REQUEST
        }
        ErrorCategory::NotFound => http::StatusCode::NOT_FOUND,
        ErrorCategory::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
        ErrorCategory::Authentication => http::StatusCode::UNAUTHORIZED,
        ErrorCategory::Upstream => http::StatusCode::BAD_GATEWAY,
        ErrorCategory::ServerError => http::StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Format an error as `(status, OpenAI error JSON)`.
#[must_use]
pub fn format_error(err: &ProxyError) -> (http::StatusCode, serde_json::Value) {
    let body = openai_error_payload(err.category(), &err.client_message(), err.code());
    (err.status(), body)
}

/// Build an [`ProxyError::Api`] from a non-success upstream reply.
///
/// The body is parsed best-effort: `error.message` and `error.code` are
/// forwarded when present, otherwise a generic message is used.
#[must_use]
pub fn upstream_api_error(status: http::StatusCode, body: &[u8]) -> ProxyError {
    let parsed = serde_json::from_slice::<serde_json::Value>(body).ok();
    let error = parsed.as_ref().and_then(|json| json.get("error"));

    let message = error
        .and_then(|e| e.get("message"))
        .and_then(serde_json::Value::as_str)
        .filter(|msg| !msg.is_empty())
        .map_or_else(
            || GENERIC_UPSTREAM_MESSAGE.to_string(),
            |msg| truncate_with_ellipsis(msg, UPSTREAM_ERROR_MAX_LEN),
        );
    let code = error.and_then(|e| e.get("code")).and_then(|code| match code {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    ProxyError::Api {
        status: status.as_u16(),
        message,
        code,
    }
}

impl axum::response::IntoResponse for ProxyError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = format_error(&self);
        (status, axum::Json(body)).into_response()
    }
}
