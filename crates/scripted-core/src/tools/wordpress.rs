//! WordPress REST publisher.
//!
//! Posts `{title, content, status}` to `/wp-json/wp/v2/posts` with basic
//! authentication (an application password). Every outcome is reported as a
//! message; a repeated call creates a duplicate post.

use serde_json::Value;

use crate::config::WordpressSettings;
use crate::models::PostData;

/// Result of a publish attempt.
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    /// HTTP 201 with the created post as returned by WordPress
    Created(Value),
    /// Any other HTTP status
    Rejected { status: u16, body: String },
    /// The request never produced a response
    Transport(String),
}

impl PublishOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, PublishOutcome::Created(_))
    }
}

impl std::fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishOutcome::Created(body) => {
                let pretty = serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string());
                write!(f, "Post created successfully: {pretty}")
            }
            PublishOutcome::Rejected { status, body } => {
                write!(f, "Failed to create post: {status} - {body}")
            }
            PublishOutcome::Transport(err) => {
                write!(f, "An error occurred while making the request: {err}")
            }
        }
    }
}

pub struct WordpressPublisher {
    client: reqwest::Client,
    endpoint: String,
    username: String,
    password: String,
}

impl WordpressPublisher {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn from_settings(client: reqwest::Client, settings: &WordpressSettings) -> Self {
        Self::new(
            client,
            settings.endpoint.clone(),
            settings.username.clone(),
            settings.password.clone(),
        )
    }

    pub fn posts_url(&self) -> String {
        format!("{}/wp-json/wp/v2/posts", self.endpoint)
    }

    /// Publish and return a human-readable message.
    pub async fn publish(&self, post: &PostData) -> String {
        self.publish_outcome(post).await.to_string()
    }

    pub async fn publish_outcome(&self, post: &PostData) -> PublishOutcome {
        let url = self.posts_url();
        tracing::info!("[Wordpress] POST {} (status: {})", url, post.status);

        let response = match self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(post)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("[Wordpress] Request failed: {}", e);
                return PublishOutcome::Transport(e.to_string());
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return PublishOutcome::Transport(e.to_string()),
        };

        if status == reqwest::StatusCode::CREATED {
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            PublishOutcome::Created(body)
        } else {
            tracing::warn!("[Wordpress] Post rejected with {}", status);
            PublishOutcome::Rejected {
                status: status.as_u16(),
                body: text,
            }
        }
    }
}
