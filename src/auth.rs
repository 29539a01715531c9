use crate::error::ProxyError;
use http::header::{HeaderName, AUTHORIZATION};

const X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");

pub(crate) const MISSING_API_KEY_MESSAGE: &str = "Missing API key. Please provide it in the Authorization header or as GROK_API_KEY environment variable.";

#[inline]
fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Token of a `Bearer` credential. The scheme name is case-insensitive.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim_start().split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token)
}

/// Resolve the credential forwarded to the upstream.
///
/// Precedence: `Authorization: Bearer <key>`, then `x-api-key: <key>`, then
/// the process-level `fallback`. Empty values count as absent.
#[must_use]
pub fn extract_api_key<'a>(
    headers: &'a http::HeaderMap,
    fallback: Option<&'a str>,
) -> Option<&'a str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .and_then(non_empty)
        .or_else(|| {
            headers
                .get(X_API_KEY)
                .and_then(|v| v.to_str().ok())
                .and_then(non_empty)
        })
        .or_else(|| fallback.and_then(non_empty))
}

/// Like [`extract_api_key`], but a missing credential is an error.
///
/// # Errors
///
/// Returns [`ProxyError::Authentication`] when no credential is available.
pub fn require_api_key<'a>(
    headers: &'a http::HeaderMap,
    fallback: Option<&'a str>,
) -> Result<&'a str, ProxyError> {
    extract_api_key(headers, fallback)
        .ok_or_else(|| ProxyError::Authentication(MISSING_API_KEY_MESSAGE.to_string()))
}
