use serde::Deserialize;

use super::{
    GrokChatRequest, GrokCompletionRequest, GrokEmbeddingRequest, GrokMessage, GrokRequest,
    GrokRole,
};
use crate::config::UpstreamConfig;
use crate::error::ProxyError;
use crate::protocol::openai::{
    ChatCompletionRequest, CompletionRequest, EmbeddingRequest, OpenAiStop,
};
use crate::routing::Route;

pub const DEFAULT_TEMPERATURE: f64 = 1.0;
pub const DEFAULT_MAX_TOKENS: u64 = 1024;
pub const DEFAULT_TOP_P: f64 = 1.0;

/// Map an inbound `OpenAI`-shaped body onto the upstream request for `route`.
///
/// A missing body is treated as `{}`.
///
/// # Errors
///
/// Returns [`ProxyError::InvalidRequest`] when the route is not forwarded, the
/// body does not match the route's request shape, or a required field
/// (`messages`, `input`) is missing.
pub fn encode_grok_request(
    route: Route,
    body: Option<&serde_json::Value>,
    config: &UpstreamConfig,
) -> Result<GrokRequest, ProxyError> {
    let empty = serde_json::Value::Object(serde_json::Map::new());
    let body = body.unwrap_or(&empty);
    match route {
        Route::ChatCompletions => encode_chat(parse_body(body)?, config).map(GrokRequest::Chat),
        Route::Completions => Ok(GrokRequest::Completion(encode_completion(
            parse_body(body)?,
            config,
        ))),
        Route::Embeddings => {
            encode_embedding(parse_body(body)?, config).map(GrokRequest::Embedding)
        }
        Route::Models | Route::Unsupported => Err(ProxyError::InvalidRequest(format!(
            "Unsupported endpoint: {route}"
        ))),
    }
}

fn parse_body<'de, T: Deserialize<'de>>(body: &'de serde_json::Value) -> Result<T, ProxyError> {
    if !body.is_object() {
        return Err(ProxyError::InvalidRequest(
            "Request body must be a JSON object".to_string(),
        ));
    }
    T::deserialize(body).map_err(|e| ProxyError::InvalidRequest(format!("Invalid request body: {e}")))
}

/// Pass ids carrying the upstream prefix through, substitute the default
/// model for everything else.
#[must_use]
pub fn map_model(model: Option<&str>, config: &UpstreamConfig) -> String {
    match model {
        Some(model) if model.starts_with(config.model_prefix.as_str()) => model.to_string(),
        _ => config.default_model.clone(),
    }
}

#[must_use]
pub fn map_role(role: Option<&str>) -> GrokRole {
    match role {
        Some("system") => GrokRole::System,
        Some("assistant") => GrokRole::Model,
        _ => GrokRole::User,
    }
}

fn map_stop(stop: Option<OpenAiStop>) -> Option<Vec<String>> {
    stop.map(OpenAiStop::into_vec)
}

fn encode_chat(
    req: ChatCompletionRequest,
    config: &UpstreamConfig,
) -> Result<GrokChatRequest, ProxyError> {
    let messages = req
        .messages
        .ok_or_else(|| ProxyError::InvalidRequest("'messages' is required".to_string()))?;
    let messages = messages
        .into_iter()
        .map(|msg| GrokMessage {
            role: map_role(msg.role.as_deref()),
            content: msg
                .content
                .filter(|content| !content.is_null())
                .unwrap_or_else(|| serde_json::Value::String(String::new())),
        })
        .collect();

    Ok(GrokChatRequest {
        model: map_model(req.model.as_deref(), config),
        messages,
        temperature: req.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        max_tokens: req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        top_p: req.top_p.unwrap_or(DEFAULT_TOP_P),
        stream: req.stream.unwrap_or(false),
        stop_sequences: map_stop(req.stop),
    })
}

fn encode_completion(req: CompletionRequest, config: &UpstreamConfig) -> GrokCompletionRequest {
    GrokCompletionRequest {
        model: map_model(req.model.as_deref(), config),
        prompt: req.prompt.filter(|prompt| !prompt.is_null()),
        temperature: req.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        max_tokens: req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        top_p: req.top_p.unwrap_or(DEFAULT_TOP_P),
        stream: req.stream.unwrap_or(false),
        stop_sequences: map_stop(req.stop),
    }
}

fn encode_embedding(
    req: EmbeddingRequest,
    config: &UpstreamConfig,
) -> Result<GrokEmbeddingRequest, ProxyError> {
    let input = req
        .input
        .ok_or_else(|| ProxyError::InvalidRequest("'input' is required".to_string()))?;
    Ok(GrokEmbeddingRequest {
        model: map_model(req.model.as_deref(), config),
        input: input.into_vec(),
    })
}
