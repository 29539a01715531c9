use serde::de::DeserializeOwned;

use super::{GrokChatResponse, GrokCompletionResponse, GrokEmbeddingResponse, GrokUsage};
use crate::error::ProxyError;
use crate::protocol::openai::{
    AssistantMessage, ChatChoice, ChatCompletionResponse, EmbeddingDatum, EmbeddingList,
    EmbeddingUsage, TextChoice, TextCompletionResponse, Usage, OBJECT_CHAT_COMPLETION,
    OBJECT_TEXT_COMPLETION,
};
use crate::routing::Route;
use crate::util::{timestamp_id, unix_now_secs};

const DEFAULT_FINISH_REASON: &str = "stop";

/// Map a successful, non-streaming upstream body back to the `OpenAI` shape
/// for `route`. `model` is echoed verbatim into the output.
///
/// # Errors
///
/// Returns [`ProxyError::Translation`] when the upstream body is not JSON of
/// the expected shape, or [`ProxyError::InvalidRequest`] for routes that are
/// never forwarded.
pub fn decode_grok_response(
    route: Route,
    body: &[u8],
    model: &str,
) -> Result<serde_json::Value, ProxyError> {
    let value = match route {
        Route::ChatCompletions => {
            serde_json::to_value(decode_chat(parse_upstream(body)?, model))
        }
        Route::Completions => {
            serde_json::to_value(decode_completion(parse_upstream(body)?, model))
        }
        Route::Embeddings => {
            serde_json::to_value(decode_embedding(parse_upstream(body)?, model))
        }
        Route::Models | Route::Unsupported => {
            return Err(ProxyError::InvalidRequest(format!(
                "Unsupported endpoint: {route}"
            )))
        }
    };
    value.map_err(|e| ProxyError::Translation(format!("failed to encode response: {e}")))
}

fn parse_upstream<T: DeserializeOwned>(body: &[u8]) -> Result<T, ProxyError> {
    serde_json::from_slice(body)
        .map_err(|e| ProxyError::Translation(format!("invalid upstream response: {e}")))
}

fn index_of(position: usize) -> u32 {
    u32::try_from(position).unwrap_or(u32::MAX)
}

fn non_empty_or_empty_string(value: Option<serde_json::Value>) -> serde_json::Value {
    value
        .filter(|v| !v.is_null())
        .unwrap_or_else(|| serde_json::Value::String(String::new()))
}

fn finish_reason_or_stop(reason: Option<String>) -> String {
    reason
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_FINISH_REASON.to_string())
}

fn map_usage(usage: Option<GrokUsage>) -> Usage {
    let usage = usage.unwrap_or_default();
    Usage {
        prompt_tokens: usage.prompt_tokens.unwrap_or(0),
        completion_tokens: usage.completion_tokens.unwrap_or(0),
        total_tokens: usage.total_tokens.unwrap_or(0),
    }
}

#[must_use]
pub fn decode_chat(resp: GrokChatResponse, model: &str) -> ChatCompletionResponse {
    let choices = resp
        .choices
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(position, choice)| ChatChoice {
            index: index_of(position),
            message: AssistantMessage {
                role: "assistant",
                content: non_empty_or_empty_string(choice.message.and_then(|m| m.content)),
            },
            finish_reason: finish_reason_or_stop(choice.finish_reason),
        })
        .collect();

    ChatCompletionResponse {
        id: timestamp_id("chatcmpl"),
        object: OBJECT_CHAT_COMPLETION,
        created: unix_now_secs(),
        model: model.to_string(),
        choices,
        usage: map_usage(resp.usage),
    }
}

#[must_use]
pub fn decode_completion(resp: GrokCompletionResponse, model: &str) -> TextCompletionResponse {
    let choices = resp
        .choices
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(position, choice)| TextChoice {
            index: index_of(position),
            text: non_empty_or_empty_string(choice.text),
            finish_reason: finish_reason_or_stop(choice.finish_reason),
        })
        .collect();

    TextCompletionResponse {
        id: timestamp_id("cmpl"),
        object: OBJECT_TEXT_COMPLETION,
        created: unix_now_secs(),
        model: model.to_string(),
        choices,
        usage: map_usage(resp.usage),
    }
}

#[must_use]
pub fn decode_embedding(resp: GrokEmbeddingResponse, model: &str) -> EmbeddingList {
    let data = resp
        .data
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(position, datum)| EmbeddingDatum {
            object: "embedding",
            embedding: datum
                .embedding
                .filter(|e| !e.is_null())
                .unwrap_or_else(|| serde_json::Value::Array(Vec::new())),
            index: index_of(position),
        })
        .collect();
    let usage = resp.usage.unwrap_or_default();

    EmbeddingList {
        object: "list",
        data,
        model: model.to_string(),
        usage: EmbeddingUsage {
            prompt_tokens: usage.prompt_tokens.unwrap_or(0),
            total_tokens: usage.total_tokens.unwrap_or(0),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(route: Route, body: serde_json::Value) -> serde_json::Value {
        decode_grok_response(route, body.to_string().as_bytes(), "gpt-4o").unwrap()
    }

    #[test]
    fn chat_response_is_projected() {
        let out = decode(
            Route::ChatCompletions,
            json!({
                "choices": [
                    { "message": { "content": "Hello" }, "finishReason": "length" },
                    { "message": { "content": "Hi" } }
                ],
                "usage": { "promptTokens": 3, "completionTokens": 2, "totalTokens": 5 }
            }),
        );
        assert_eq!(out["object"], "chat.completion");
        assert!(out["id"].as_str().unwrap().starts_with("chatcmpl-"));
        assert!(out["created"].as_u64().unwrap() > 0);
        assert_eq!(out["model"], "gpt-4o");
        assert_eq!(out["choices"][0]["index"], 0);
        assert_eq!(out["choices"][0]["message"]["role"], "assistant");
        assert_eq!(out["choices"][0]["message"]["content"], "Hello");
        assert_eq!(out["choices"][0]["finish_reason"], "length");
        assert_eq!(out["choices"][1]["index"], 1);
        assert_eq!(out["choices"][1]["finish_reason"], "stop");
        assert_eq!(out["usage"]["prompt_tokens"], 3);
        assert_eq!(out["usage"]["completion_tokens"], 2);
        assert_eq!(out["usage"]["total_tokens"], 5);
    }

    #[test]
    fn minimal_chat_reply_is_complete() {
        let out = decode(Route::ChatCompletions, json!({}));
        assert_eq!(out["choices"], json!([]));
        assert_eq!(
            out["usage"],
            json!({ "prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0 })
        );
    }

    #[test]
    fn chat_choice_without_message_has_empty_content() {
        let out = decode(Route::ChatCompletions, json!({ "choices": [{}] }));
        assert_eq!(out["choices"][0]["message"]["content"], "");
        assert_eq!(out["choices"][0]["finish_reason"], "stop");
    }

    #[test]
    fn completion_response_is_projected() {
        let out = decode(
            Route::Completions,
            json!({ "choices": [{ "text": "once upon" }], "usage": { "totalTokens": 9 } }),
        );
        assert_eq!(out["object"], "text_completion");
        assert!(out["id"].as_str().unwrap().starts_with("cmpl-"));
        assert_eq!(out["choices"][0]["text"], "once upon");
        assert_eq!(out["choices"][0]["finish_reason"], "stop");
        assert_eq!(out["usage"]["total_tokens"], 9);
        assert_eq!(out["usage"]["prompt_tokens"], 0);
    }

    #[test]
    fn embedding_response_uses_positional_index() {
        let out = decode(
            Route::Embeddings,
            json!({
                "data": [{ "embedding": [0.1, 0.2] }, { "embedding": [0.3] }],
                "usage": { "promptTokens": 4, "totalTokens": 4 }
            }),
        );
        assert_eq!(out["object"], "list");
        assert_eq!(out["model"], "gpt-4o");
        assert_eq!(out["data"][0]["object"], "embedding");
        assert_eq!(out["data"][0]["embedding"], json!([0.1, 0.2]));
        assert_eq!(out["data"][1]["index"], 1);
        assert_eq!(out["usage"], json!({ "prompt_tokens": 4, "total_tokens": 4 }));
    }

    #[test]
    fn unparseable_upstream_body_is_translation_error() {
        let err = decode_grok_response(Route::ChatCompletions, b"not json", "m").unwrap_err();
        assert!(matches!(err, ProxyError::Translation(_)));
    }
}
