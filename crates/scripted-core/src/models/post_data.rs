//! The structured post record handed from extraction to publishing.
//!
//! Agents reply in free text, so [`PostData::from_agent_output`] tolerates a
//! surrounding Markdown code fence but otherwise checks the schema strictly:
//! every field present, every field a string, status one of the known values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PipelineError;

/// WordPress post status accepted by the publish step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Publish,
    Pending,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Publish => "publish",
            PostStatus::Pending => "pending",
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PostStatus {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "publish" => Ok(PostStatus::Publish),
            "pending" => Ok(PostStatus::Pending),
            other => Err(PipelineError::Validation(format!(
                "invalid status '{other}', expected one of: draft, publish, pending"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostData {
    pub title: String,
    pub content: String,
    pub status: PostStatus,
}

impl PostData {
    pub fn new(title: impl Into<String>, content: impl Into<String>, status: PostStatus) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            status,
        }
    }

    /// Parse and validate the JSON emitted by the extraction agent.
    pub fn from_agent_output(raw: &str) -> Result<Self, PipelineError> {
        let body = strip_code_fence(raw);
        let value: Value = serde_json::from_str(body)
            .map_err(|e| PipelineError::Validation(format!("output is not valid JSON: {e}")))?;
        Self::from_value(&value)
    }

    /// Validate an already-parsed JSON value. Unknown keys are ignored.
    pub fn from_value(value: &Value) -> Result<Self, PipelineError> {
        let obj = value.as_object().ok_or_else(|| {
            PipelineError::Validation("expected a JSON object with title, content and status".to_string())
        })?;

        let field = |name: &str| -> Result<String, PipelineError> {
            match obj.get(name) {
                Some(Value::String(s)) => Ok(s.clone()),
                Some(other) => Err(PipelineError::Validation(format!(
                    "field '{name}' must be a string, got {}",
                    json_type(other)
                ))),
                None => Err(PipelineError::Validation(format!("missing required field '{name}'"))),
            }
        };

        let title = field("title")?;
        let content = field("content")?;
        let status = field("status")?.parse()?;

        Ok(Self { title, content, status })
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let post = PostData::from_agent_output(r#"{"title":"T","content":"C","status":"draft"}"#).unwrap();
        assert_eq!(post, PostData::new("T", "C", PostStatus::Draft));
    }

    #[test]
    fn test_parse_fenced_json_with_extra_keys() {
        let raw = "```json\n{\"title\": \"Crews\", \"content\": \"<p>hi</p>\", \"status\": \"publish\", \"tags\": []}\n```";
        let post = PostData::from_agent_output(raw).unwrap();
        assert_eq!(post.title, "Crews");
        assert_eq!(post.status, PostStatus::Publish);
    }

    #[test]
    fn test_missing_field_rejected() {
        let err = PostData::from_agent_output(r#"{"title":"T","status":"draft"}"#).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert!(err.to_string().contains("content"));
    }

    #[test]
    fn test_wrong_type_rejected() {
        let err = PostData::from_agent_output(r#"{"title":1,"content":"C","status":"draft"}"#).unwrap_err();
        assert!(err.to_string().contains("'title' must be a string, got number"));
    }

    #[test]
    fn test_unknown_status_rejected() {
        let err = PostData::from_agent_output(r#"{"title":"T","content":"C","status":"live"}"#).unwrap_err();
        assert!(err.to_string().contains("invalid status 'live'"));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(PostData::from_agent_output("[1,2]").is_err());
        assert!(PostData::from_agent_output("not json").is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_value(PostData::new("T", "C", PostStatus::Pending)).unwrap();
        assert_eq!(json, serde_json::json!({"title": "T", "content": "C", "status": "pending"}));
    }
}
