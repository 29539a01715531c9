use crate::config::UpstreamConfig;
use crate::protocol::openai::{ModelCard, ModelList};

const MODEL_CREATED_UNIX_SECS: u64 = 1_699_488_000;
const MODEL_OWNER: &str = "grok";

/// Static listing with the single configured upstream model. Served without
/// contacting the upstream.
#[must_use]
pub(crate) fn model_list(config: &UpstreamConfig) -> ModelList {
    ModelList {
        object: "list",
        data: vec![ModelCard {
            id: config.default_model.clone(),
            object: "model",
            created: MODEL_CREATED_UNIX_SECS,
            owned_by: MODEL_OWNER,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_has_one_model() {
        let value = serde_json::to_value(model_list(&UpstreamConfig::default())).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "object": "list",
                "data": [{
                    "id": "grok-1",
                    "object": "model",
                    "created": 1_699_488_000u64,
                    "owned_by": "grok"
                }]
            })
        );
    }
}
