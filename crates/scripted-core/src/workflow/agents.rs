//! Agent definitions: role-specific personas loaded from YAML.
//!
//! An agents file is a map from agent id to persona:
//!
//! ```yaml
//! researcher:
//!   role: "{topic} Senior Researcher"
//!   goal: "Uncover accurate, current facts about {topic}"
//!   backstory: |
//!     You dig through documentation and find what matters.
//! writer:
//!   role: "Technical Blog Writer"
//!   goal: "Write an engaging post about {topic}"
//!   backstory: "You turn research notes into clear prose."
//!   model: "gpt-4o"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// A persona bound to one or more pipeline steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDef {
    /// Agent id; filled from the map key when loading a file
    #[serde(default)]
    pub id: String,

    pub role: String,

    pub goal: String,

    #[serde(default)]
    pub backstory: String,

    /// Model override for this agent
    #[serde(default, alias = "llm")]
    pub model: Option<String>,
}

impl AgentDef {
    /// Render the system prompt, substituting `{name}` placeholders.
    pub fn system_prompt(&self, resolve: impl Fn(&str) -> String) -> String {
        let mut prompt = format!("You are {}.", resolve(&self.role));
        if !self.backstory.trim().is_empty() {
            prompt.push(' ');
            prompt.push_str(resolve(&self.backstory).trim());
        }
        prompt.push_str("\nYour personal goal is: ");
        prompt.push_str(resolve(&self.goal).trim());
        prompt
    }
}

/// Holds the agents available to a pipeline, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct AgentLoader {
    agents: BTreeMap<String, AgentDef>,
}

impl AgentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader pre-populated with the built-in agents.
    pub fn with_builtins() -> Self {
        let mut loader = Self::new();
        for agent in Self::builtin_agents() {
            loader.insert(agent);
        }
        loader
    }

    pub fn insert(&mut self, agent: AgentDef) {
        self.agents.insert(agent.id.clone(), agent);
    }

    /// Parse an agents map from YAML and merge it, overriding existing ids.
    pub fn load_yaml(&mut self, yaml: &str) -> Result<usize, PipelineError> {
        let parsed: BTreeMap<String, AgentDef> = serde_yaml::from_str(yaml)
            .map_err(|e| PipelineError::Definition(format!("Failed to parse agents YAML: {e}")))?;
        let count = parsed.len();
        for (id, mut agent) in parsed {
            agent.id = id;
            tracing::info!("[AgentLoader] Loaded agent: {} ({})", agent.id, agent.role);
            self.insert(agent);
        }
        Ok(count)
    }

    pub fn load_file(&mut self, path: &Path) -> Result<usize, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Definition(format!("Failed to read agents file '{}': {}", path.display(), e))
        })?;
        self.load_yaml(&content)
    }

    pub fn get(&self, id: &str) -> Option<&AgentDef> {
        self.agents.get(id)
    }

    pub fn all(&self) -> impl Iterator<Item = &AgentDef> {
        self.agents.values()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.agents.keys().map(|k| k.as_str()).collect()
    }

    /// Built-in personas for the blog pipeline.
    pub fn builtin_agents() -> Vec<AgentDef> {
        vec![
            AgentDef {
                id: "researcher".to_string(),
                role: "{topic} Senior Data Researcher".to_string(),
                goal: "Uncover accurate, up-to-date information about {topic}, starting from {seed_url}".to_string(),
                backstory: "You are a seasoned researcher known for finding the most relevant facts \
                    in documentation and presenting them as clear, well-organized notes."
                    .to_string(),
                model: None,
            },
            AgentDef {
                id: "writer".to_string(),
                role: "Technical Blog Writer".to_string(),
                goal: "Write an engaging, accurate blog post about {topic} in Markdown".to_string(),
                backstory: "You turn research notes into approachable long-form articles with \
                    headings, examples and a clear conclusion."
                    .to_string(),
                model: None,
            },
            AgentDef {
                id: "image_designer".to_string(),
                role: "Editorial Illustrator".to_string(),
                goal: "Describe a single striking header illustration for a post about {topic}".to_string(),
                backstory: "You write precise prompts for image-generation models. Your prompts \
                    avoid text in the image and describe style, subject and composition."
                    .to_string(),
                model: None,
            },
            AgentDef {
                id: "html_page_developer".to_string(),
                role: "HTML Content Developer".to_string(),
                goal: "Convert the post into clean, semantic HTML suitable for a WordPress body".to_string(),
                backstory: "You produce HTML fragments without <html>, <head> or <body> wrappers \
                    and place the header image at the top."
                    .to_string(),
                model: None,
            },
            AgentDef {
                id: "json_developer".to_string(),
                role: "Structured Data Specialist".to_string(),
                goal: "Return the post as a JSON object with title, content and status".to_string(),
                backstory: "You answer with JSON only: no commentary and no Markdown.".to_string(),
                model: None,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_yaml_overrides_builtin() {
        let yaml = r#"
writer:
  role: "Casual Blogger"
  goal: "Write about {topic}"
  llm: "gpt-4o-mini"
editor:
  role: "Editor"
  goal: "Polish the draft"
  backstory: "Strict but fair."
"#;
        let mut loader = AgentLoader::with_builtins();
        assert_eq!(loader.load_yaml(yaml).unwrap(), 2);

        let writer = loader.get("writer").unwrap();
        assert_eq!(writer.role, "Casual Blogger");
        assert_eq!(writer.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(loader.get("editor").unwrap().id, "editor");
        assert!(loader.get("researcher").is_some());
    }

    #[test]
    fn test_invalid_yaml_is_definition_error() {
        let mut loader = AgentLoader::new();
        let err = loader.load_yaml("writer: [not, a, map]").unwrap_err();
        assert!(matches!(err, PipelineError::Definition(_)));
    }

    #[test]
    fn test_system_prompt_resolves_placeholders() {
        let agent = AgentLoader::builtin_agents()
            .into_iter()
            .find(|a| a.id == "researcher")
            .unwrap();
        let prompt = agent.system_prompt(|s| s.replace("{topic}", "Crews").replace("{seed_url}", "https://x"));
        assert!(prompt.starts_with("You are Crews Senior Data Researcher."));
        assert!(prompt.contains("Your personal goal is: Uncover accurate, up-to-date information about Crews, starting from https://x"));
    }

    #[test]
    fn test_builtin_agents() {
        let loader = AgentLoader::with_builtins();
        assert_eq!(
            loader.ids(),
            vec!["html_page_developer", "image_designer", "json_developer", "researcher", "writer"]
        );
    }
}
