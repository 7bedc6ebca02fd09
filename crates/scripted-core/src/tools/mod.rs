//! Tool adapters: one external API call each.
//!
//! | Tool | External API |
//! |---|---|
//! | [`WebScraper`] | plain HTTP GET of the seed page |
//! | [`OpenAiImageGenerator`] | image-generation endpoint |
//! | [`ImageDownloader`] | plain HTTP GET of the generated image |
//! | [`GcsUploader`] | Cloud Storage JSON API media upload |
//! | [`WordpressPublisher`] | WordPress REST `wp/v2/posts` |

pub mod gcs_uploader;
pub mod image_downloader;
pub mod image_generator;
pub mod scraper;
pub mod wordpress;

use std::time::Duration;

use crate::error::PipelineError;

pub use gcs_uploader::{GcsUploader, ServiceAccountTokenProvider, StaticTokenProvider, TokenProvider};
pub use image_downloader::ImageDownloader;
pub use image_generator::{ImageGenerator, OpenAiImageGenerator};
pub use scraper::WebScraper;
pub use wordpress::{PublishOutcome, WordpressPublisher};

/// Build the shared HTTP client used by the adapters.
pub fn http_client(timeout: Duration, accept_invalid_certs: bool) -> Result<reqwest::Client, PipelineError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .map_err(|e| PipelineError::Config(format!("Failed to build HTTP client: {e}")))
}
