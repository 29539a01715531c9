use crate::error::ErrorCategory;

fn openai_error_type(cat: ErrorCategory) -> &'static str {
    match cat {
        ErrorCategory::InvalidRequest
        | ErrorCategory::NotFound
        | ErrorCategory::MethodNotAllowed => "invalid_request_error",
        ErrorCategory::Authentication => "authentication_error",
        ErrorCategory::Upstream => "api_error",
        ErrorCategory::UnsupportedOperation => "unsupported_operation",
        ErrorCategory::ServerError => "server_error",
    }
}

/// `{"error":{"message","type","code"?}}`
#[must_use]
pub(crate) fn openai_error_payload(
    cat: ErrorCategory,
    message: &str,
    code: Option<&str>,
) -> serde_json::Value {
    let mut error = serde_json::json!({
        "message": message,
        "type": openai_error_type(cat),
    });
    if let (Some(code), Some(obj)) = (code, error.as_object_mut()) {
        obj.insert("code".to_string(), serde_json::Value::from(code));
    }
    serde_json::json!({ "error": error })
}

/// Payload of the terminal error frame written into a broken stream:
/// `{"error":{"message"}}`.
#[must_use]
pub(crate) fn stream_error_payload(message: &str) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "message": message,
        }
    })
}
