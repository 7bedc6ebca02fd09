//! Image generation client.

use async_trait::async_trait;
use serde_json::json;

use crate::config::ImageSettings;
use crate::error::PipelineError;

/// Turns a prompt into a URL of a generated image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, PipelineError>;
}

/// OpenAI images API (`/v1/images/generations`).
pub struct OpenAiImageGenerator {
    client: reqwest::Client,
    settings: ImageSettings,
}

impl OpenAiImageGenerator {
    pub fn new(client: reqwest::Client, settings: ImageSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
        let url = format!(
            "{}/v1/images/generations",
            self.settings.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": self.settings.model,
            "prompt": prompt,
            "size": self.settings.size,
            "quality": self.settings.quality,
            "n": 1,
        });

        tracing::info!("[ImageGenerator] Requesting image (model: {})", self.settings.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Network(format!("Image generation request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PipelineError::Network(format!("Failed to read image response: {e}")))?;
        if !status.is_success() {
            return Err(PipelineError::Network(format!(
                "Image generation returned {status}: {text}"
            )));
        }

        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| PipelineError::Network(format!("Failed to parse image response: {e}")))?;
        json.get("data")
            .and_then(|d| d.as_array())
            .and_then(|arr| arr.first())
            .and_then(|item| item.get("url"))
            .and_then(|u| u.as_str())
            .map(|u| u.to_string())
            .ok_or_else(|| PipelineError::Network("Image response did not contain data[0].url".to_string()))
    }
}
