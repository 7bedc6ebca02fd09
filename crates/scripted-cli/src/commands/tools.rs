//! `scripted download` / `upload` / `publish`: run one adapter directly.

use std::path::Path;
use std::time::Duration;

use scripted_core::tools::{http_client, GcsUploader, ImageDownloader, WordpressPublisher};
use scripted_core::{PipelineConfig, PostData, PostStatus};

use super::load_config;

/// Download `url` to `output`. Needs no credentials.
pub async fn download(url: &str, output: &str) -> Result<(), String> {
    let client = http_client(Duration::from_secs(120), false).map_err(|e| e.to_string())?;
    let path = ImageDownloader::new(client, output)
        .download(url)
        .await
        .map_err(|e| e.to_string())?;
    println!("✅ Image downloaded to {}", path.display());
    Ok(())
}

pub async fn upload(path: &str) -> Result<(), String> {
    let url = upload_with(&load_config()?, path).await?;
    println!("{url}");
    Ok(())
}

/// Upload with an explicit configuration and return the public URL.
pub async fn upload_with(config: &PipelineConfig, path: &str) -> Result<String, String> {
    let client = http_client(config.http_timeout, false).map_err(|e| e.to_string())?;
    let uploader = GcsUploader::from_settings(client, &config.storage).map_err(|e| e.to_string())?;
    uploader.upload(Path::new(path)).await.map_err(|e| e.to_string())
}

pub async fn publish(title: &str, content: &str, status: &str) -> Result<(), String> {
    let post = parse_post(title, content, status)?;
    let message = publish_with(&load_config()?, &post).await?;
    println!("{message}");
    Ok(())
}

/// Build the post record, rejecting an unknown status before any request.
pub fn parse_post(title: &str, content: &str, status: &str) -> Result<PostData, String> {
    let status: PostStatus = status.parse().map_err(|e: scripted_core::PipelineError| e.to_string())?;
    Ok(PostData::new(title, content, status))
}

/// Publish with an explicit configuration. Anything but a created post is an
/// error carrying the CMS message.
pub async fn publish_with(config: &PipelineConfig, post: &PostData) -> Result<String, String> {
    let client = http_client(config.http_timeout, config.wordpress.insecure_tls).map_err(|e| e.to_string())?;
    let outcome = WordpressPublisher::from_settings(client, &config.wordpress)
        .publish_outcome(post)
        .await;

    if outcome.is_created() {
        Ok(outcome.to_string())
    } else {
        Err(outcome.to_string())
    }
}
