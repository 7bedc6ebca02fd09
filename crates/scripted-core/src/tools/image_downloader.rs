//! Fetches the generated image to a local handoff file.

use std::path::{Path, PathBuf};

use crate::error::PipelineError;

pub struct ImageDownloader {
    client: reqwest::Client,
    output_path: PathBuf,
}

impl ImageDownloader {
    pub fn new(client: reqwest::Client, output_path: impl Into<PathBuf>) -> Self {
        Self {
            client,
            output_path: output_path.into(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// GET `url` and write the body to the output path, replacing any
    /// existing file. Nothing is written unless the response is a success.
    pub async fn download(&self, url: &str) -> Result<PathBuf, PipelineError> {
        tracing::info!("[ImageDownloader] GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::Network(format!("GET {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Network(format!("GET {url} returned {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::Network(format!("Failed to read body of {url}: {e}")))?;

        tokio::fs::write(&self.output_path, &bytes).await?;
        tracing::info!(
            "[ImageDownloader] Wrote {} bytes to {}",
            bytes.len(),
            self.output_path.display()
        );
        Ok(self.output_path.clone())
    }
}
