pub mod encoder;
pub mod response_decoder;
pub mod stream;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Upstream requests
// ---------------------------------------------------------------------------

/// Upstream chat role. `assistant` turns are sent as `model`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GrokRole {
    System,
    Model,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrokMessage {
    pub role: GrokRole,
    pub content: serde_json::Value,
}

/// Body of `POST /v1/chat/completions` on the upstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrokChatRequest {
    pub model: String,
    pub messages: Vec<GrokMessage>,
    pub temperature: f64,
    pub max_tokens: u64,
    pub top_p: f64,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

/// Body of `POST /v1/completions` on the upstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrokCompletionRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<serde_json::Value>,
    pub temperature: f64,
    pub max_tokens: u64,
    pub top_p: f64,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

/// Body of `POST /v1/embeddings` on the upstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrokEmbeddingRequest {
    pub model: String,
    pub input: Vec<serde_json::Value>,
}

/// Any upstream request body. Serializes as the inner body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GrokRequest {
    Chat(GrokChatRequest),
    Completion(GrokCompletionRequest),
    Embedding(GrokEmbeddingRequest),
}

impl GrokRequest {
    #[must_use]
    pub fn model(&self) -> &str {
        match self {
            GrokRequest::Chat(req) => &req.model,
            GrokRequest::Completion(req) => &req.model,
            GrokRequest::Embedding(req) => &req.model,
        }
    }

    /// Embeddings never stream.
    #[must_use]
    pub fn is_stream(&self) -> bool {
        match self {
            GrokRequest::Chat(req) => req.stream,
            GrokRequest::Completion(req) => req.stream,
            GrokRequest::Embedding(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Upstream responses
// ---------------------------------------------------------------------------

/// Upstream token accounting. Every field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrokUsage {
    #[serde(default, alias = "prompt_tokens")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, alias = "completion_tokens")]
    pub completion_tokens: Option<u64>,
    #[serde(default, alias = "total_tokens")]
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GrokChatResponse {
    #[serde(default)]
    pub choices: Option<Vec<GrokChatChoice>>,
    #[serde(default)]
    pub usage: Option<GrokUsage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrokChatChoice {
    #[serde(default)]
    pub message: Option<GrokResponseMessage>,
    #[serde(default, alias = "finish_reason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GrokResponseMessage {
    #[serde(default)]
    pub content: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GrokCompletionResponse {
    #[serde(default)]
    pub choices: Option<Vec<GrokTextChoice>>,
    #[serde(default)]
    pub usage: Option<GrokUsage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrokTextChoice {
    #[serde(default)]
    pub text: Option<serde_json::Value>,
    #[serde(default, alias = "finish_reason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GrokEmbeddingResponse {
    #[serde(default)]
    pub data: Option<Vec<GrokEmbeddingDatum>>,
    #[serde(default)]
    pub usage: Option<GrokUsage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GrokEmbeddingDatum {
    #[serde(default)]
    pub embedding: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_uses_camel_case_and_omits_absent_stop() {
        let req = GrokChatRequest {
            model: "grok-1".to_string(),
            messages: vec![GrokMessage {
                role: GrokRole::Model,
                content: serde_json::json!("hi"),
            }],
            temperature: 0.5,
            max_tokens: 16,
            top_p: 1.0,
            stream: false,
            stop_sequences: None,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["maxTokens"], 16);
        assert_eq!(value["topP"].as_f64(), Some(1.0));
        assert_eq!(value["messages"][0]["role"], "model");
        assert!(value.get("stopSequences").is_none());
        assert!(value.get("max_tokens").is_none());
    }

    #[test]
    fn untagged_request_serializes_inner_body() {
        let req = GrokRequest::Embedding(GrokEmbeddingRequest {
            model: "grok-1".to_string(),
            input: vec![serde_json::json!("x")],
        });
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value, serde_json::json!({ "model": "grok-1", "input": ["x"] }));
        assert!(!req.is_stream());
    }

    #[test]
    fn usage_accepts_camel_and_snake_case() {
        let camel: GrokUsage =
            serde_json::from_value(serde_json::json!({ "promptTokens": 3, "totalTokens": 5 }))
                .unwrap();
        assert_eq!(camel.prompt_tokens, Some(3));
        assert_eq!(camel.total_tokens, Some(5));
        assert_eq!(camel.completion_tokens, None);

        let snake: GrokUsage =
            serde_json::from_value(serde_json::json!({ "completion_tokens": 7 })).unwrap();
        assert_eq!(snake.completion_tokens, Some(7));
    }

    #[test]
    fn chat_choice_reads_finish_reason_alias() {
        let choice: GrokChatChoice = serde_json::from_value(serde_json::json!({
            "message": { "content": "hi" },
            "finish_reason": "length"
        }))
        .unwrap();
        assert_eq!(choice.finish_reason.as_deref(), Some("length"));
    }
}
