//! Environment-driven configuration.
//!
//! Secrets (CMS password, LLM keys, storage credentials) are read from the
//! process environment, optionally seeded from `.env.local` / `.env`.
//! Existing environment variables always take priority over file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::PipelineError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_STORAGE_BASE_URL: &str = "https://storage.googleapis.com";

/// Settings for the LLM that backs agent steps.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Adapter type: "openai" or "anthropic"
    pub provider: String,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f64>,
}

/// Settings for the image-generation provider.
#[derive(Debug, Clone)]
pub struct ImageSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub size: String,
    pub quality: String,
}

#[derive(Debug, Clone)]
pub struct WordpressSettings {
    /// Site root, e.g. `https://blog.example.com`
    pub endpoint: String,
    pub username: String,
    /// Application password
    pub password: String,
    /// Skip TLS certificate verification (self-signed installs)
    pub insecure_tls: bool,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub bucket: String,
    /// Path to the service-account JSON key
    pub credentials_path: PathBuf,
    /// Pre-issued OAuth2 access token; bypasses the service-account exchange
    pub access_token: Option<String>,
    /// JSON API host used for uploads
    pub api_base_url: String,
    /// Host used to build the public object URL
    pub public_base_url: String,
}

/// Full configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub llm: LlmSettings,
    pub image: ImageSettings,
    pub wordpress: WordpressSettings,
    pub storage: StorageSettings,
    /// Where the image download step writes (and the upload step reads)
    pub image_output_path: PathBuf,
    /// Directory receiving `output_file` artifacts (post.md, post.html)
    pub work_dir: PathBuf,
    pub http_timeout: Duration,
    pub scrape_max_chars: usize,
}

impl PipelineConfig {
    /// Load `.env.local` and `.env` (if present), then read the environment.
    pub fn from_env() -> Result<Self, PipelineError> {
        load_dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Every missing required variable is reported in a single error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut missing: Vec<&str> = Vec::new();
        let mut require = |key: &'static str, value: Option<String>| {
            if value.is_none() {
                missing.push(key);
            }
            value.unwrap_or_default()
        };

        let openai_key = require("OPENAI_API_KEY", get("OPENAI_API_KEY"));
        let wp_endpoint = require("WORDPRESS_URL", get("WORDPRESS_URL"));
        let wp_user = require("WORDPRESS_USERNAME", get("WORDPRESS_USERNAME"));
        let wp_password = require("WORDPRESS_APP_PASSWORD", get("WORDPRESS_APP_PASSWORD"));
        let bucket = require("GCS_BUCKET", get("GCS_BUCKET"));

        if !missing.is_empty() {
            return Err(PipelineError::Config(format!(
                "missing required environment variable(s): {}. Set them in the environment or a .env file.",
                missing.join(", ")
            )));
        }

        let provider = get("LLM_PROVIDER").unwrap_or_else(|| "openai".to_string());
        let llm_base_url = get("LLM_BASE_URL").unwrap_or_else(|| match provider.as_str() {
            "anthropic" => DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            _ => get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
        });
        let llm_api_key = get("LLM_API_KEY").unwrap_or_else(|| openai_key.clone());
        let temperature = match get("LLM_TEMPERATURE") {
            Some(raw) => Some(parse_number::<f64>("LLM_TEMPERATURE", &raw)?),
            None => None,
        };

        let http_timeout = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("HTTP_TIMEOUT_SECS", &raw)?),
            None => Duration::from_secs(120),
        };
        let scrape_max_chars = match get("SCRAPE_MAX_CHARS") {
            Some(raw) => parse_number("SCRAPE_MAX_CHARS", &raw)?,
            None => 20_000,
        };

        Ok(Self {
            llm: LlmSettings {
                provider,
                base_url: llm_base_url,
                api_key: llm_api_key,
                model: get("LLM_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
                temperature,
            },
            image: ImageSettings {
                base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                api_key: openai_key,
                model: get("IMAGE_MODEL").unwrap_or_else(|| "dall-e-3".to_string()),
                size: get("IMAGE_SIZE").unwrap_or_else(|| "1024x1024".to_string()),
                quality: get("IMAGE_QUALITY").unwrap_or_else(|| "standard".to_string()),
            },
            wordpress: WordpressSettings {
                endpoint: wp_endpoint.trim_end_matches('/').to_string(),
                username: wp_user,
                password: wp_password,
                insecure_tls: get("WORDPRESS_INSECURE_TLS").is_some_and(|v| parse_flag(&v)),
            },
            storage: StorageSettings {
                bucket,
                credentials_path: get("GOOGLE_APPLICATION_CREDENTIALS")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("credentials.json")),
                access_token: get("GCS_ACCESS_TOKEN"),
                api_base_url: get("GCS_API_BASE_URL").unwrap_or_else(|| DEFAULT_STORAGE_BASE_URL.to_string()),
                public_base_url: DEFAULT_STORAGE_BASE_URL.to_string(),
            },
            image_output_path: get("IMAGE_OUTPUT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("header.png")),
            work_dir: PathBuf::from("."),
            http_timeout,
            scrape_max_chars,
        })
    }

    /// Write artifacts under `dir`. A relative image path moves with it.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if self.image_output_path.is_relative() {
            self.image_output_path = dir.join(&self.image_output_path);
        }
        self.work_dir = dir;
        self
    }

    /// Suffix the image handoff file with the run id (`header-<run_id>.png`)
    /// so concurrent runs never share it.
    pub fn with_unique_image_path(mut self, run_id: &str) -> Self {
        let path = &self.image_output_path;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "header".to_string());
        let file_name = match path.extension() {
            Some(ext) => format!("{stem}-{run_id}.{}", ext.to_string_lossy()),
            None => format!("{stem}-{run_id}"),
        };
        self.image_output_path = path.with_file_name(file_name);
        self
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, PipelineError> {
    raw.parse()
        .map_err(|_| PipelineError::Config(format!("{key} must be a number, got '{raw}'")))
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Load `.env.local` (higher priority) and then `.env` from the current
/// directory. Variables already set in the environment are kept.
pub fn load_dotenv() {
    load_dotenv_from(Path::new("."));
}

pub fn load_dotenv_from(dir: &Path) {
    for filename in [".env.local", ".env"] {
        let path = dir.join(filename);
        match dotenvy::from_path(&path) {
            Ok(()) => tracing::info!("[Config] Loaded environment from '{}'", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("[Config] Failed to load '{}': {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("WORDPRESS_URL", "https://blog.example.com/"),
            ("WORDPRESS_USERNAME", "admin"),
            ("WORDPRESS_APP_PASSWORD", "abcd efgh"),
            ("GCS_BUCKET", "images_scripted_bucket"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<PipelineConfig, PipelineError> {
        PipelineConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.api_key, "sk-test");
        assert_eq!(config.image.model, "dall-e-3");
        assert_eq!(config.wordpress.endpoint, "https://blog.example.com");
        assert!(!config.wordpress.insecure_tls);
        assert_eq!(config.storage.credentials_path, PathBuf::from("credentials.json"));
        assert_eq!(config.image_output_path, PathBuf::from("header.png"));
        assert_eq!(config.http_timeout, Duration::from_secs(120));
        assert_eq!(config.scrape_max_chars, 20_000);
    }

    #[test]
    fn test_missing_variables_reported_together() {
        let mut env = base_env();
        env.remove("WORDPRESS_APP_PASSWORD");
        env.insert("GCS_BUCKET", "   ");
        let err = load(&env).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(msg.contains("WORDPRESS_APP_PASSWORD"));
        assert!(msg.contains("GCS_BUCKET"));
    }

    #[test]
    fn test_overrides() {
        let mut env = base_env();
        env.insert("LLM_PROVIDER", "anthropic");
        env.insert("LLM_API_KEY", "ak-test");
        env.insert("WORDPRESS_INSECURE_TLS", "true");
        env.insert("HTTP_TIMEOUT_SECS", "5");
        env.insert("IMAGE_OUTPUT_PATH", "/tmp/run/header.png");
        let config = load(&env).unwrap();
        assert_eq!(config.llm.base_url, DEFAULT_ANTHROPIC_BASE_URL);
        assert_eq!(config.llm.api_key, "ak-test");
        assert_eq!(config.image.api_key, "sk-test");
        assert!(config.wordpress.insecure_tls);
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.image_output_path, PathBuf::from("/tmp/run/header.png"));
    }

    #[test]
    fn test_work_dir_and_unique_image_path() {
        let config = load(&base_env())
            .unwrap()
            .with_work_dir("/tmp/out")
            .with_unique_image_path("run-1");
        assert_eq!(config.work_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.image_output_path, PathBuf::from("/tmp/out/header-run-1.png"));

        let mut env = base_env();
        env.insert("IMAGE_OUTPUT_PATH", "/var/images/hero.png");
        let config = load(&env).unwrap().with_work_dir("/tmp/out");
        assert_eq!(config.image_output_path, PathBuf::from("/var/images/hero.png"));
    }

    #[test]
    fn test_bad_number_rejected() {
        let mut env = base_env();
        env.insert("SCRAPE_MAX_CHARS", "lots");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("SCRAPE_MAX_CHARS"));
    }

    #[test]
    fn test_dotenv_local_wins_and_environment_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env.local"),
            "SCRIPTED_DOTENV_LOCAL=local\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "SCRIPTED_DOTENV_LOCAL=base\nSCRIPTED_DOTENV_BASE=base\nCARGO_PKG_NAME=overwritten\n",
        )
        .unwrap();

        load_dotenv_from(dir.path());

        assert_eq!(std::env::var("SCRIPTED_DOTENV_LOCAL").unwrap(), "local");
        assert_eq!(std::env::var("SCRIPTED_DOTENV_BASE").unwrap(), "base");
        assert_eq!(std::env::var("CARGO_PKG_NAME").unwrap(), env!("CARGO_PKG_NAME"));
    }

    #[test]
    fn test_dotenv_missing_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        load_dotenv_from(dir.path());
    }
}
