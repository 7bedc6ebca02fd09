use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Inputs supplied once at invocation; immutable for the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInputs {
    pub topic: String,
    pub seed_url: String,
}

impl RunInputs {
    pub fn new(topic: impl Into<String>, seed_url: impl Into<String>) -> Result<Self, PipelineError> {
        let inputs = Self {
            topic: topic.into().trim().to_string(),
            seed_url: seed_url.into().trim().to_string(),
        };
        if inputs.topic.is_empty() {
            return Err(PipelineError::Config("topic must not be empty".to_string()));
        }
        if inputs.seed_url.is_empty() {
            return Err(PipelineError::Config("seed URL must not be empty".to_string()));
        }
        Ok(inputs)
    }

    /// Value for a `{name}` placeholder, if this input defines it.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        match name {
            "topic" => Some(&self.topic),
            "seed_url" | "main_font" => Some(&self.seed_url),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_inputs_trimmed_and_required() {
        let inputs = RunInputs::new("  What is a crew?  ", "https://docs.example.com/crews").unwrap();
        assert_eq!(inputs.topic, "What is a crew?");
        assert_eq!(inputs.lookup("seed_url"), Some("https://docs.example.com/crews"));
        assert_eq!(inputs.lookup("main_font"), Some("https://docs.example.com/crews"));
        assert_eq!(inputs.lookup("other"), None);

        assert!(RunInputs::new("", "https://x").is_err());
        assert!(RunInputs::new("topic", "   ").is_err());
    }
}
