//! Core error type for the content pipeline.
//!
//! `PipelineError` is used by the adapters, the configuration loader and
//! the executor. The publish adapter is the exception: it reports transport
//! problems as a message string instead of failing.

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Missing or malformed configuration. Fatal before any step runs.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failure or non-success HTTP status.
    #[error("Network error: {0}")]
    Network(String),

    /// A tool adapter failed (credentials, bucket, upload I/O).
    #[error("Tool error: {0}")]
    Tool(String),

    /// Structured output did not match the expected schema.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The pipeline definition is malformed (unknown step, cycle, bad YAML).
    #[error("Pipeline definition error: {0}")]
    Definition(String),

    /// The LLM call behind an agent step failed.
    #[error("Agent error: {0}")]
    Agent(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Short machine-friendly label, used in step results and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Config(_) => "config",
            PipelineError::Network(_) => "network",
            PipelineError::Tool(_) => "tool",
            PipelineError::Validation(_) => "validation",
            PipelineError::Definition(_) => "definition",
            PipelineError::Agent(_) => "agent",
            PipelineError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_and_kind() {
        let err = PipelineError::Network("GET http://x returned 404".to_string());
        assert_eq!(err.to_string(), "Network error: GET http://x returned 404");
        assert_eq!(err.kind(), "network");

        let io: PipelineError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(io.kind(), "io");
    }
}
