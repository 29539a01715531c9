use serde::{Deserialize, Serialize};

pub const OBJECT_CHAT_COMPLETION: &str = "chat.completion";
pub const OBJECT_CHAT_COMPLETION_CHUNK: &str = "chat.completion.chunk";
pub const OBJECT_TEXT_COMPLETION: &str = "text_completion";
pub const OBJECT_TEXT_COMPLETION_CHUNK: &str = "text_completion.chunk";

// ---------------------------------------------------------------------------
// Inbound requests
// ---------------------------------------------------------------------------

/// `OpenAI` Chat Completion request, as accepted from callers.
///
/// Only the fields the upstream understands are modelled; anything else in
/// the body is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<ChatMessage>>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub stream: Option<bool>,
    #[serde(default)]
    pub stop: Option<OpenAiStop>,
}

/// `OpenAI` message wire type. `content` is kept as raw JSON so structured
/// content is forwarded untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<serde_json::Value>,
}

/// Legacy `OpenAI` Completion request.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub prompt: Option<serde_json::Value>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub stream: Option<bool>,
    #[serde(default)]
    pub stop: Option<OpenAiStop>,
}

/// `OpenAI` Embeddings request.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub input: Option<EmbeddingInput>,
}

/// `stop` field: a single sequence or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OpenAiStop {
    Single(String),
    Multi(Vec<String>),
}

impl OpenAiStop {
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OpenAiStop::Single(stop) => vec![stop],
            OpenAiStop::Multi(stops) => stops,
        }
    }
}

/// `input` field of an embeddings request: one item or a batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Many(Vec<serde_json::Value>),
    One(serde_json::Value),
}

impl EmbeddingInput {
    #[must_use]
    pub fn into_vec(self) -> Vec<serde_json::Value> {
        match self {
            EmbeddingInput::Many(items) => items,
            EmbeddingInput::One(item) => vec![item],
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound responses
// ---------------------------------------------------------------------------

/// Token accounting for completion-style responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: &'static str,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: AssistantMessage,
    pub finish_reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssistantMessage {
    pub role: &'static str,
    pub content: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextCompletionResponse {
    pub id: String,
    pub object: &'static str,
    pub created: u64,
    pub model: String,
    pub choices: Vec<TextChoice>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextChoice {
    pub index: u32,
    pub text: serde_json::Value,
    pub finish_reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingList {
    pub object: &'static str,
    pub data: Vec<EmbeddingDatum>,
    pub model: String,
    pub usage: EmbeddingUsage,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingDatum {
    pub object: &'static str,
    pub embedding: serde_json::Value,
    pub index: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EmbeddingUsage {
    pub prompt_tokens: u64,
    pub total_tokens: u64,
}

// ---------------------------------------------------------------------------
// Streaming chunks
// ---------------------------------------------------------------------------

/// One `chat.completion.chunk` event. `finish_reason` is serialized as
/// `null` until the upstream reports one.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionChunk<'a> {
    pub id: &'a str,
    pub object: &'static str,
    pub created: u64,
    pub model: &'a str,
    pub choices: [ChatChunkChoice; 1],
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatChunkChoice {
    pub index: u32,
    pub delta: ChatChunkDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatChunkDelta {
    pub content: serde_json::Value,
}

/// One `text_completion.chunk` event.
#[derive(Debug, Clone, Serialize)]
pub struct TextCompletionChunk<'a> {
    pub id: &'a str,
    pub object: &'static str,
    pub created: u64,
    pub model: &'a str,
    pub choices: [TextChunkChoice; 1],
}

#[derive(Debug, Clone, Serialize)]
pub struct TextChunkChoice {
    pub index: u32,
    pub text: serde_json::Value,
    pub finish_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Model listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ModelList {
    pub object: &'static str,
    pub data: Vec<ModelCard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelCard {
    pub id: String,
    pub object: &'static str,
    pub created: u64,
    pub owned_by: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_accepts_string_and_list() {
        let single: OpenAiStop = serde_json::from_value(serde_json::json!("END")).unwrap();
        assert_eq!(single.into_vec(), vec!["END".to_string()]);

        let multi: OpenAiStop = serde_json::from_value(serde_json::json!(["a", "b"])).unwrap();
        assert_eq!(multi.into_vec(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn null_fields_read_as_absent() {
        let req: ChatCompletionRequest = serde_json::from_value(serde_json::json!({
            "model": null,
            "messages": [],
            "stop": null,
            "temperature": null
        }))
        .unwrap();
        assert!(req.model.is_none());
        assert!(req.stop.is_none());
        assert!(req.temperature.is_none());
        assert_eq!(req.messages.map(|m| m.len()), Some(0));
    }

    #[test]
    fn embedding_input_wraps_scalar() {
        let req: EmbeddingRequest =
            serde_json::from_value(serde_json::json!({ "input": "hello" })).unwrap();
        let input = req.input.unwrap().into_vec();
        assert_eq!(input, vec![serde_json::json!("hello")]);

        let req: EmbeddingRequest =
            serde_json::from_value(serde_json::json!({ "input": ["a", "b"] })).unwrap();
        assert_eq!(req.input.unwrap().into_vec().len(), 2);
    }

    #[test]
    fn chunk_serializes_null_finish_reason() {
        let chunk = ChatCompletionChunk {
            id: "chatcmpl-1",
            object: OBJECT_CHAT_COMPLETION_CHUNK,
            created: 1,
            model: "grok-1",
            choices: [ChatChunkChoice {
                index: 0,
                delta: ChatChunkDelta {
                    content: serde_json::json!("hi"),
                },
                finish_reason: None,
            }],
        };
        let value = serde_json::to_value(&chunk).unwrap();
        assert!(value["choices"][0]["finish_reason"].is_null());
        assert_eq!(value["choices"][0]["delta"]["content"], "hi");
    }
}
