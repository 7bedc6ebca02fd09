//! Seed-page scraper for the research step.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::PipelineError;

static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|svg)\b[^>]*>.*?</(script|style|noscript|svg)>")
        .expect("valid regex")
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid regex"));
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

pub struct WebScraper {
    client: reqwest::Client,
    max_chars: usize,
}

impl WebScraper {
    pub fn new(client: reqwest::Client, max_chars: usize) -> Self {
        Self { client, max_chars }
    }

    /// Fetch `url` and return its readable text.
    pub async fn scrape(&self, url: &str) -> Result<String, PipelineError> {
        tracing::info!("[WebScraper] GET {}", url);
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

        let html = response
            .text()
            .await
            .map_err(|e| PipelineError::Network(format!("Failed to read body of {url}: {e}")))?;
        Ok(html_to_text(&html, self.max_chars))
    }
}

/// Strip markup and collapse whitespace, keeping at most `max_chars` chars.
pub fn html_to_text(html: &str, max_chars: usize) -> String {
    let without_blocks = BLOCK_RE.replace_all(html, " ");
    let without_tags = TAG_RE.replace_all(&without_blocks, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    let collapsed = WS_RE.replace_all(&decoded, " ");
    collapsed.trim().chars().take(max_chars).collect()
}
