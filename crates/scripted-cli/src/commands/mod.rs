//! CLI command implementations.
//!
//! `pipeline` drives whole runs; `tools` calls one adapter at a time.

pub mod pipeline;
pub mod tools;

use scripted_core::PipelineConfig;

/// Load configuration from `.env` files and the environment.
pub fn load_config() -> Result<PipelineConfig, String> {
    PipelineConfig::from_env().map_err(|e| e.to_string())
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}
