use crate::protocol::openai::{
    ChatChunkChoice, ChatChunkDelta, ChatCompletionChunk, TextChunkChoice, TextCompletionChunk,
    OBJECT_CHAT_COMPLETION_CHUNK, OBJECT_TEXT_COMPLETION_CHUNK,
};
use crate::routing::Route;

/// Which `OpenAI` chunk shape a stream is re-encoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Chat,
    Completion,
}

impl StreamKind {
    /// Only chat and legacy completions stream.
    #[must_use]
    pub fn for_route(route: Route) -> Option<Self> {
        match route {
            Route::ChatCompletions => Some(StreamKind::Chat),
            Route::Completions => Some(StreamKind::Completion),
            Route::Embeddings | Route::Models | Route::Unsupported => None,
        }
    }

    #[must_use]
    pub fn id_prefix(self) -> &'static str {
        match self {
            StreamKind::Chat => "chatcmpl",
            StreamKind::Completion => "cmpl",
        }
    }

    #[must_use]
    pub fn object(self) -> &'static str {
        match self {
            StreamKind::Chat => OBJECT_CHAT_COMPLETION_CHUNK,
            StreamKind::Completion => OBJECT_TEXT_COMPLETION_CHUNK,
        }
    }
}

/// Per-stream values stamped on every chunk.
#[derive(Debug, Clone)]
pub struct ChunkIdentity {
    pub id: String,
    pub created: u64,
    pub model: String,
}

fn first_choice(payload: &serde_json::Value) -> Option<&serde_json::Value> {
    payload.get("choices").and_then(|choices| choices.get(0))
}

fn text_or_empty(value: Option<&serde_json::Value>) -> serde_json::Value {
    match value {
        Some(v) if !v.is_null() => v.clone(),
        _ => serde_json::Value::String(String::new()),
    }
}

fn finish_reason(choice: Option<&serde_json::Value>) -> Option<String> {
    choice
        .and_then(|c| c.get("finish_reason").or_else(|| c.get("finishReason")))
        .and_then(serde_json::Value::as_str)
        .filter(|reason| !reason.is_empty())
        .map(str::to_string)
}

/// Project one parsed upstream stream event into `OpenAI` chunk JSON.
///
/// Only the first upstream choice is read. Missing text defaults to `""`
/// and a missing finish reason to `null`.
///
/// # Errors
///
/// Returns the serializer error if the chunk cannot be encoded.
pub fn encode_chunk(
    kind: StreamKind,
    identity: &ChunkIdentity,
    payload: &serde_json::Value,
) -> Result<Vec<u8>, serde_json::Error> {
    let choice = first_choice(payload);
    match kind {
        StreamKind::Chat => {
            let content = choice
                .and_then(|c| c.get("delta"))
                .and_then(|delta| delta.get("content"));
            serde_json::to_vec(&ChatCompletionChunk {
                id: &identity.id,
                object: kind.object(),
                created: identity.created,
                model: &identity.model,
                choices: [ChatChunkChoice {
                    index: 0,
                    delta: ChatChunkDelta {
                        content: text_or_empty(content),
                    },
                    finish_reason: finish_reason(choice),
                }],
            })
        }
        StreamKind::Completion => {
            let text = choice.and_then(|c| c.get("text"));
            serde_json::to_vec(&TextCompletionChunk {
                id: &identity.id,
                object: kind.object(),
                created: identity.created,
                model: &identity.model,
                choices: [TextChunkChoice {
                    index: 0,
                    text: text_or_empty(text),
                    finish_reason: finish_reason(choice),
                }],
            })
        }
    }
}
