//! Agent Caller: runs an agent step as a single LLM call over HTTP.
//!
//! Two wire formats are supported:
//! - `openai`: `POST {base_url}/v1/chat/completions` (default)
//! - `anthropic`: `POST {base_url}/v1/messages`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmSettings;
use crate::error::PipelineError;

/// One prompt for one agent.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub agent_id: String,
    /// Overrides the configured model when set
    pub model: Option<String>,
    pub system_prompt: String,
    pub user_prompt: String,
}

/// Response from an agent call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    /// The agent's text response
    pub content: String,
    /// Model used
    pub model: String,
    pub usage: Option<UsageInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageInfo {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// Executes agent steps. Stubbed in tests.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, request: &AgentRequest) -> Result<AgentResponse, PipelineError>;
}

/// Calls an LLM provider via HTTP API.
pub struct AgentCaller {
    client: reqwest::Client,
    settings: LlmSettings,
}

impl AgentCaller {
    pub fn new(client: reqwest::Client, settings: LlmSettings) -> Self {
        Self { client, settings }
    }

    fn model_for<'a>(&'a self, request: &'a AgentRequest) -> &'a str {
        request.model.as_deref().unwrap_or(&self.settings.model)
    }

    async fn post_json(
        &self,
        request: reqwest::RequestBuilder,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, PipelineError> {
        let response = request
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| PipelineError::Agent(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PipelineError::Agent(format!("Failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(PipelineError::Agent(format!("API returned {status}: {text}")));
        }

        serde_json::from_str(&text)
            .map_err(|e| PipelineError::Agent(format!("Failed to parse response JSON: {e}")))
    }

    /// Call the OpenAI-compatible chat completions API.
    async fn call_openai(&self, request: &AgentRequest) -> Result<AgentResponse, PipelineError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );
        let model = self.model_for(request);

        let mut messages = vec![];
        if !request.system_prompt.is_empty() {
            messages.push(serde_json::json!({
                "role": "system",
                "content": request.system_prompt
            }));
        }
        messages.push(serde_json::json!({
            "role": "user",
            "content": request.user_prompt
        }));

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages
        });
        if let Some(temp) = self.settings.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        tracing::info!(
            "[AgentCaller] {} → OpenAI API: {} (model: {})",
            request.agent_id,
            url,
            model
        );

        let json = self
            .post_json(self.client.post(&url).bearer_auth(&self.settings.api_key), &body)
            .await?;

        let content = json
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or("")
            .to_string();

        let usage = json.get("usage").map(|u| UsageInfo {
            input_tokens: u
                .get("prompt_tokens")
                .or_else(|| u.get("input_tokens"))
                .and_then(|v| v.as_u64()),
            output_tokens: u
                .get("completion_tokens")
                .or_else(|| u.get("output_tokens"))
                .and_then(|v| v.as_u64()),
        });

        Ok(AgentResponse {
            content,
            model: json
                .get("model")
                .and_then(|m| m.as_str())
                .unwrap_or(model)
                .to_string(),
            usage,
        })
    }

    /// Call the Anthropic Messages API.
    async fn call_anthropic(&self, request: &AgentRequest) -> Result<AgentResponse, PipelineError> {
        let url = format!("{}/v1/messages", self.settings.base_url.trim_end_matches('/'));
        let model = self.model_for(request);

        let mut body = serde_json::json!({
            "model": model,
            "max_tokens": 8192,
            "messages": [
                {
                    "role": "user",
                    "content": request.user_prompt
                }
            ]
        });
        if !request.system_prompt.is_empty() {
            body["system"] = serde_json::Value::String(request.system_prompt.clone());
        }
        if let Some(temp) = self.settings.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        tracing::info!(
            "[AgentCaller] {} → Anthropic API: {} (model: {})",
            request.agent_id,
            url,
            model
        );

        let builder = self
            .client
            .post(&url)
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", "2023-06-01");
        let json = self.post_json(builder, &body).await?;

        // Concatenate the text blocks of the reply
        let content = json
            .get("content")
            .and_then(|c| c.as_array())
            .map(|arr| {
                arr.iter()
                    .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
                    .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        let usage = json.get("usage").map(|u| UsageInfo {
            input_tokens: u.get("input_tokens").and_then(|v| v.as_u64()),
            output_tokens: u.get("output_tokens").and_then(|v| v.as_u64()),
        });

        Ok(AgentResponse {
            content,
            model: json
                .get("model")
                .and_then(|m| m.as_str())
                .unwrap_or(model)
                .to_string(),
            usage,
        })
    }
}

#[async_trait]
impl AgentRunner for AgentCaller {
    async fn run(&self, request: &AgentRequest) -> Result<AgentResponse, PipelineError> {
        let response = match self.settings.provider.as_str() {
            "openai" => self.call_openai(request).await?,
            "anthropic" => self.call_anthropic(request).await?,
            other => {
                return Err(PipelineError::Config(format!(
                    "Unknown LLM provider '{other}' (expected 'openai' or 'anthropic')"
                )))
            }
        };
        if response.content.trim().is_empty() {
            return Err(PipelineError::Agent(format!(
                "Agent '{}' returned an empty response",
                request.agent_id
            )));
        }
        Ok(response)
    }
}
