//! Cloud Storage uploader.
//!
//! Uploads the downloaded image under a fresh `image_<uuid>.png` name and
//! returns its public URL. Authentication goes through a [`TokenProvider`]:
//! the default exchanges a service-account key for an OAuth2 access token
//! (JWT bearer grant), while [`StaticTokenProvider`] uses a pre-issued token.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::StorageSettings;
use crate::error::PipelineError;

const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Supplies bearer tokens for the storage API.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self, client: &reqwest::Client) -> Result<String, PipelineError>;
}

/// A token obtained out of band (e.g. `gcloud auth print-access-token`).
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self, _client: &reqwest::Client) -> Result<String, PipelineError> {
        Ok(self.token.clone())
    }
}

/// The fields of a service-account key file that the token exchange needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct ServiceAccountTokenProvider {
    key: ServiceAccountKey,
}

impl ServiceAccountTokenProvider {
    pub fn new(key: ServiceAccountKey) -> Self {
        Self { key }
    }

    /// Load a service-account JSON key from disk.
    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Tool(format!(
                "Failed to read service account credentials '{}': {}",
                path.display(),
                e
            ))
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&content).map_err(|e| {
            PipelineError::Tool(format!(
                "Invalid service account credentials '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::new(key))
    }

    fn token_uri(&self) -> &str {
        self.key.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }

    fn signed_assertion(&self) -> Result<String, PipelineError> {
        let now = chrono::Utc::now().timestamp();
        let claims = JwtClaims {
            iss: &self.key.client_email,
            scope: STORAGE_SCOPE,
            aud: self.token_uri(),
            iat: now,
            exp: now + 3600,
        };
        let key = jsonwebtoken::EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| PipelineError::Tool(format!("Invalid service account private key: {e}")))?;
        jsonwebtoken::encode(&jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256), &claims, &key)
            .map_err(|e| PipelineError::Tool(format!("Failed to sign token request: {e}")))
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self, client: &reqwest::Client) -> Result<String, PipelineError> {
        let assertion = self.signed_assertion()?;

        let response = client
            .post(self.token_uri())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| PipelineError::Tool(format!("Token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Tool(format!("Token endpoint returned {status}: {text}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Tool(format!("Failed to parse token response: {e}")))?;
        Ok(token.access_token)
    }
}

/// Generate a globally unique object name for an uploaded image.
pub fn object_name() -> String {
    format!("image_{}.png", uuid::Uuid::new_v4())
}

pub struct GcsUploader {
    client: reqwest::Client,
    bucket: String,
    api_base_url: String,
    public_base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl GcsUploader {
    pub fn new(
        client: reqwest::Client,
        bucket: impl Into<String>,
        api_base_url: impl Into<String>,
        public_base_url: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// Build an uploader from settings. Credentials are loaded eagerly so a
    /// bad key file is reported before the pipeline starts.
    pub fn from_settings(client: reqwest::Client, settings: &StorageSettings) -> Result<Self, PipelineError> {
        let tokens: Arc<dyn TokenProvider> = match &settings.access_token {
            Some(token) => Arc::new(StaticTokenProvider::new(token.clone())),
            None => Arc::new(ServiceAccountTokenProvider::from_file(&settings.credentials_path)?),
        };
        Ok(Self::new(
            client,
            settings.bucket.clone(),
            settings.api_base_url.clone(),
            settings.public_base_url.clone(),
            tokens,
        ))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload the file at `path` and return its public URL.
    pub async fn upload(&self, path: &Path) -> Result<String, PipelineError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            PipelineError::Tool(format!("Failed to read image '{}': {}", path.display(), e))
        })?;

        let token = self.tokens.access_token(&self.client).await?;
        let name = object_name();
        let url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.api_base_url, self.bucket, name
        );

        tracing::info!(
            "[GcsUploader] Uploading {} ({} bytes) to gs://{}/{}",
            path.display(),
            bytes.len(),
            self.bucket,
            name
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("content-type", "image/png")
            .body(bytes)
            .send()
            .await
            .map_err(|e| PipelineError::Tool(format!("Upload request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PipelineError::Tool(format!("Bucket '{}' not found", self.bucket)));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Tool(format!("Upload returned {status}: {text}")));
        }

        Ok(self.public_url(&name))
    }

    pub fn public_url(&self, object: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, self.bucket, object)
    }
}

/// Resolve the path an upload step should read, given the previous output.
///
/// The download step reports the path it wrote; when an agent paraphrases it
/// we fall back to the configured handoff path.
pub fn resolve_upload_path(previous_output: &str, fallback: &Path) -> PathBuf {
    let candidate = PathBuf::from(previous_output.trim());
    if !previous_output.trim().is_empty() && candidate.is_file() {
        candidate
    } else {
        fallback.to_path_buf()
    }
}
