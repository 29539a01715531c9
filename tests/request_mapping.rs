use grokproxy_rs::config::UpstreamConfig;
use grokproxy_rs::error::ProxyError;
use grokproxy_rs::protocol::grok::encoder::encode_grok_request;
use grokproxy_rs::protocol::grok::response_decoder::decode_grok_response;
use grokproxy_rs::routing::Route;
use serde_json::{json, Value};

fn encode(route: Route, body: Value) -> Value {
    let request = encode_grok_request(route, Some(&body), &UpstreamConfig::default())
        .expect("encode request");
    serde_json::to_value(request).expect("serialize request")
}

#[test]
fn chat_request_defaults_and_stop() {
    let sent = encode(
        Route::ChatCompletions,
        json!({ "messages": [{ "role": "user", "content": "hi" }], "stop": "foo" }),
    );
    assert_eq!(
        sent,
        json!({
            "model": "grok-1",
            "messages": [{ "role": "user", "content": "hi" }],
            "temperature": 1.0,
            "maxTokens": 1024,
            "topP": 1.0,
            "stream": false,
            "stopSequences": ["foo"]
        })
    );

    let sent = encode(
        Route::ChatCompletions,
        json!({ "messages": [], "stop": ["a", "b"], "temperature": 0.2, "top_p": 0.9 }),
    );
    assert_eq!(sent["stopSequences"], json!(["a", "b"]));
    assert_eq!(sent["temperature"], 0.2);
    assert_eq!(sent["topP"], 0.9);

    let sent = encode(Route::ChatCompletions, json!({ "messages": [] }));
    assert!(sent.get("stopSequences").is_none());
}

#[test]
fn roles_map_onto_the_upstream_vocabulary() {
    let sent = encode(
        Route::ChatCompletions,
        json!({
            "messages": [
                { "role": "system", "content": "s" },
                { "role": "assistant", "content": "a" },
                { "role": "user", "content": "u" },
                { "role": "tool", "content": "t" },
                { "content": "none" }
            ]
        }),
    );
    let roles: Vec<&str> = sent["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, ["system", "model", "user", "user", "user"]);
}

#[test]
fn model_ids_are_substituted_or_kept() {
    let config = UpstreamConfig::default();
    for (inbound, expected) in [
        (json!("gpt-4o"), "grok-1"),
        (json!("grok-2-mini"), "grok-2-mini"),
        (json!(""), "grok-1"),
        (Value::Null, "grok-1"),
    ] {
        let body = json!({ "model": inbound, "prompt": "x" });
        let request = encode_grok_request(Route::Completions, Some(&body), &config).unwrap();
        assert_eq!(request.model(), expected);
    }
}

#[test]
fn encoding_is_deterministic() {
    let body = json!({
        "model": "gpt-4o",
        "messages": [{ "role": "assistant", "content": "x" }],
        "stop": "END",
        "stream": true
    });
    let first = encode(Route::ChatCompletions, body.clone());
    let second = encode(Route::ChatCompletions, body);
    assert_eq!(first, second);
}

#[test]
fn completion_and_embedding_shapes() {
    let sent = encode(
        Route::Completions,
        json!({ "prompt": ["a", "b"], "max_tokens": 5, "stream": true }),
    );
    assert_eq!(sent["prompt"], json!(["a", "b"]));
    assert_eq!(sent["maxTokens"], 5);
    assert_eq!(sent["stream"], true);

    let sent = encode(Route::Embeddings, json!({ "input": ["x", "y"], "stream": true }));
    assert_eq!(sent, json!({ "model": "grok-1", "input": ["x", "y"] }));
}

#[test]
fn malformed_bodies_are_invalid_requests() {
    let config = UpstreamConfig::default();
    for (route, body) in [
        (Route::ChatCompletions, json!({})),
        (Route::ChatCompletions, json!({ "messages": "hi" })),
        (Route::Embeddings, json!({ "model": "e" })),
        (Route::Completions, json!([1, 2])),
    ] {
        let err = encode_grok_request(route, Some(&body), &config).unwrap_err();
        assert!(matches!(err, ProxyError::InvalidRequest(_)), "{route}: {err}");
    }
}

#[test]
fn well_formed_reply_round_trips() {
    let inbound = json!({
        "model": "gpt-4o-mini",
        "messages": [{ "role": "user", "content": "ping" }]
    });
    let request = encode_grok_request(
        Route::ChatCompletions,
        Some(&inbound),
        &UpstreamConfig::default(),
    )
    .unwrap();
    assert!(!request.is_stream());

    let reply = br#"{
        "choices": [
            { "message": { "content": "pong" }, "finishReason": "stop" },
            { "message": { "content": "pong 2" }, "finishReason": "length" }
        ],
        "usage": { "promptTokens": 3, "completionTokens": 4, "totalTokens": 7 }
    }"#;
    let decoded = decode_grok_response(Route::ChatCompletions, reply, "gpt-4o-mini").unwrap();

    assert_eq!(decoded["object"], "chat.completion");
    assert_eq!(decoded["model"], "gpt-4o-mini");
    assert!(decoded["id"].as_str().unwrap().starts_with("chatcmpl-"));
    assert_eq!(decoded["choices"][0]["message"]["role"], "assistant");
    assert_eq!(decoded["choices"][0]["message"]["content"], "pong");
    assert_eq!(decoded["choices"][1]["index"], 1);
    assert_eq!(decoded["choices"][1]["finish_reason"], "length");
    assert_eq!(
        decoded["usage"],
        json!({ "prompt_tokens": 3, "completion_tokens": 4, "total_tokens": 7 })
    );
}

#[test]
fn sparse_reply_gets_defaults() {
    let decoded = decode_grok_response(Route::Completions, br#"{"choices":[{}]}"#, "m").unwrap();
    assert_eq!(decoded["choices"][0]["text"], "");
    assert_eq!(decoded["choices"][0]["finish_reason"], "stop");
    assert_eq!(decoded["usage"]["total_tokens"], 0);

    let err = decode_grok_response(Route::Embeddings, b"not json", "m").unwrap_err();
    assert!(matches!(err, ProxyError::Translation(_)));
}
