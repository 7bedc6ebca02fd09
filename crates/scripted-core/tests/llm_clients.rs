//! Chat and image-generation clients against stub provider APIs.

mod common;

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;

use common::{Recorded, Recorder};
use scripted_core::config::{ImageSettings, LlmSettings};
use scripted_core::tools::{ImageGenerator, OpenAiImageGenerator};
use scripted_core::workflow::{AgentCaller, AgentRequest, AgentRunner};
use scripted_core::PipelineError;

fn provider_stub(recorder: Recorder) -> Router {
    Router::new()
        .route(
            "/v1/chat/completions",
            post(|State(rec): State<Recorder>, headers: HeaderMap, body: Bytes| async move {
                rec.push(Recorded::new("/chat", HashMap::new(), &headers, &body));
                axum::Json(serde_json::json!({
                    "model": "gpt-4o-2024-08-06",
                    "choices": [{"message": {"role": "assistant", "content": "- fact one"}}],
                    "usage": {"prompt_tokens": 12, "completion_tokens": 3}
                }))
            }),
        )
        .route(
            "/v1/messages",
            post(|State(rec): State<Recorder>, headers: HeaderMap, body: Bytes| async move {
                rec.push(Recorded::new("/messages", HashMap::new(), &headers, &body));
                axum::Json(serde_json::json!({
                    "model": "claude-test",
                    "content": [
                        {"type": "text", "text": "first"},
                        {"type": "tool_use", "id": "x", "name": "n", "input": {}},
                        {"type": "text", "text": "second"}
                    ],
                    "usage": {"input_tokens": 5, "output_tokens": 2}
                }))
            }),
        )
        .route(
            "/v1/images/generations",
            post(|State(rec): State<Recorder>, headers: HeaderMap, body: Bytes| async move {
                rec.push(Recorded::new("/images", HashMap::new(), &headers, &body));
                axum::Json(serde_json::json!({
                    "created": 1,
                    "data": [{"url": "https://images.example.com/abc.png"}]
                }))
            }),
        )
        .with_state(recorder)
}

fn llm(provider: &str, base_url: &str) -> LlmSettings {
    LlmSettings {
        provider: provider.to_string(),
        base_url: base_url.to_string(),
        api_key: "sk-test".to_string(),
        model: "gpt-4o".to_string(),
        temperature: Some(0.2),
    }
}

fn request(model: Option<&str>) -> AgentRequest {
    AgentRequest {
        agent_id: "researcher".to_string(),
        model: model.map(str::to_string),
        system_prompt: "You are a researcher.".to_string(),
        user_prompt: "Research crews".to_string(),
    }
}

#[tokio::test]
async fn test_openai_chat_call() {
    let recorder = Recorder::default();
    let base = common::serve(provider_stub(recorder.clone())).await;
    let caller = AgentCaller::new(common::client(), llm("openai", &base));

    let response = caller.run(&request(None)).await.unwrap();
    assert_eq!(response.content, "- fact one");
    assert_eq!(response.model, "gpt-4o-2024-08-06");
    let usage = response.usage.unwrap();
    assert_eq!(usage.input_tokens, Some(12));
    assert_eq!(usage.output_tokens, Some(3));

    let sent = &recorder.with_path_prefix("/chat")[0];
    assert_eq!(sent.header("authorization"), Some("Bearer sk-test"));
    let body = sent.json();
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["temperature"], 0.2);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "Research crews");
}

#[tokio::test]
async fn test_anthropic_call_joins_text_blocks() {
    let recorder = Recorder::default();
    let base = common::serve(provider_stub(recorder.clone())).await;
    let caller = AgentCaller::new(common::client(), llm("anthropic", &base));

    let response = caller.run(&request(Some("claude-override"))).await.unwrap();
    assert_eq!(response.content, "first\nsecond");

    let sent = &recorder.with_path_prefix("/messages")[0];
    assert_eq!(sent.header("x-api-key"), Some("sk-test"));
    assert_eq!(sent.header("anthropic-version"), Some("2023-06-01"));
    let body = sent.json();
    assert_eq!(body["model"], "claude-override");
    assert_eq!(body["system"], "You are a researcher.");
}

#[tokio::test]
async fn test_provider_error_is_agent_error() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "rate limited") }),
    );
    let base = common::serve(app).await;
    let caller = AgentCaller::new(common::client(), llm("openai", &base));

    let err = caller.run(&request(None)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Agent(_)));
    assert!(err.to_string().contains("429"));
}

#[tokio::test]
async fn test_unknown_provider_is_config_error() {
    let caller = AgentCaller::new(common::client(), llm("palm", "http://127.0.0.1:1"));
    let err = caller.run(&request(None)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}

#[tokio::test]
async fn test_image_generation_returns_first_url() {
    let recorder = Recorder::default();
    let base = common::serve(provider_stub(recorder.clone())).await;
    let generator = OpenAiImageGenerator::new(
        common::client(),
        ImageSettings {
            base_url: base,
            api_key: "sk-test".to_string(),
            model: "dall-e-3".to_string(),
            size: "1024x1024".to_string(),
            quality: "standard".to_string(),
        },
    );

    let url = generator.generate("robots in watercolor").await.unwrap();
    assert_eq!(url, "https://images.example.com/abc.png");

    let body = recorder.with_path_prefix("/images")[0].json();
    assert_eq!(body["prompt"], "robots in watercolor");
    assert_eq!(body["model"], "dall-e-3");
    assert_eq!(body["n"], 1);
}
