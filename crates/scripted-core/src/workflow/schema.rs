//! Pipeline schema: step descriptors and their dependency graph.
//!
//! A pipeline YAML lists steps; each step names the agent and/or tool it
//! uses and the earlier steps whose output it consumes:
//!
//! ```yaml
//! name: "blog_post"
//! description: "Research, write, illustrate and publish"
//!
//! steps:
//!   - id: research_task
//!     agent: researcher
//!     tool: scrape_website
//!     description: "Research {topic} starting from {seed_url}"
//!     expected_output: "Bullet-point research notes"
//!
//!   - id: writing_task
//!     agent: writer
//!     context: [research_task]
//!     output_file: post.md
//!     description: "Write a blog post about {topic}"
//! ```
//!
//! Steps execute in dependency order; ties keep declaration order.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Tool adapter a step invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Scrape the seed URL; the agent then summarizes the page
    ScrapeWebsite,
    /// Generate an image; an agent (if any) writes the prompt first
    GenerateImage,
    /// Fetch the image URL from context into the handoff file
    DownloadImage,
    /// Upload the handoff file to object storage
    UploadImage,
    /// Publish the validated post record
    PublishPost,
}

impl ToolKind {
    /// Whether an agent may be attached to a step using this tool.
    pub fn accepts_agent(&self) -> bool {
        matches!(self, ToolKind::ScrapeWebsite | ToolKind::GenerateImage)
    }

    /// Whether the tool consumes the output of a context step.
    pub fn reads_context(&self) -> bool {
        matches!(
            self,
            ToolKind::DownloadImage | ToolKind::UploadImage | ToolKind::PublishPost
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::ScrapeWebsite => "scrape_website",
            ToolKind::GenerateImage => "generate_image",
            ToolKind::DownloadImage => "download_image",
            ToolKind::UploadImage => "upload_image",
            ToolKind::PublishPost => "publish_post",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema a step's output must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSchema {
    /// `{title, content, status}`
    PostData,
}

/// A single unit of pipeline work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDescriptor {
    /// Unique step id, used in `context` lists and `${steps.<id>.output}`
    pub id: String,

    /// Task instructions (supports `{topic}` / `{seed_url}` placeholders)
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub expected_output: String,

    /// Agent id performing the step
    #[serde(default)]
    pub agent: Option<String>,

    #[serde(default)]
    pub tool: Option<ToolKind>,

    /// Ids of the steps whose output this step consumes
    #[serde(default)]
    pub context: Vec<String>,

    /// File (relative to the work dir) receiving the step output
    #[serde(default)]
    pub output_file: Option<String>,

    #[serde(default)]
    pub output_schema: Option<OutputSchema>,
}

impl StepDescriptor {
    pub(crate) fn agent_step(id: &str, agent: &str, description: &str, expected_output: &str) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            expected_output: expected_output.to_string(),
            agent: Some(agent.to_string()),
            tool: None,
            context: Vec::new(),
            output_file: None,
            output_schema: None,
        }
    }

    pub(crate) fn tool_step(id: &str, tool: ToolKind, description: &str) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            expected_output: String::new(),
            agent: None,
            tool: Some(tool),
            context: Vec::new(),
            output_file: None,
            output_schema: None,
        }
    }

    fn with_tool(mut self, tool: ToolKind) -> Self {
        self.tool = Some(tool);
        self
    }

    fn with_context(mut self, context: &[&str]) -> Self {
        self.context = context.iter().map(|c| c.to_string()).collect();
        self
    }

    fn with_output_file(mut self, file: &str) -> Self {
        self.output_file = Some(file.to_string());
        self
    }

    fn with_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }
}

/// Top-level pipeline definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    pub steps: Vec<StepDescriptor>,
}

impl PipelineDefinition {
    pub fn from_yaml(yaml: &str) -> Result<Self, PipelineError> {
        let definition: Self = serde_yaml::from_str(yaml)
            .map_err(|e| PipelineError::Definition(format!("Failed to parse pipeline YAML: {e}")))?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Definition(format!("Failed to read pipeline file '{}': {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn step(&self, id: &str) -> Option<&StepDescriptor> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Check step-level rules and the dependency graph.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.steps.is_empty() {
            return Err(PipelineError::Definition(format!("Pipeline '{}' has no steps", self.name)));
        }
        for step in &self.steps {
            match (&step.agent, step.tool) {
                (None, None) => {
                    return Err(PipelineError::Definition(format!(
                        "Step '{}' needs an agent or a tool",
                        step.id
                    )))
                }
                (Some(agent), Some(tool)) if !tool.accepts_agent() => {
                    return Err(PipelineError::Definition(format!(
                        "Step '{}': tool '{}' runs without an agent, but agent '{}' was given",
                        step.id, tool, agent
                    )))
                }
                (None, Some(ToolKind::ScrapeWebsite)) => {
                    return Err(PipelineError::Definition(format!(
                        "Step '{}': tool 'scrape_website' needs an agent to summarize the page",
                        step.id
                    )))
                }
                _ => {}
            }
            if step.output_schema.is_some() && step.agent.is_none() {
                return Err(PipelineError::Definition(format!(
                    "Step '{}': output_schema applies to agent output only",
                    step.id
                )));
            }
        }
        let order = self.execution_order()?;
        self.check_context_inputs(&order)
    }

    /// Tool steps that read a context output must have one. Publishing may
    /// instead use the record of an earlier `post_data` step.
    fn check_context_inputs(&self, order: &[usize]) -> Result<(), PipelineError> {
        let mut has_post_record = false;
        for &idx in order {
            let step = &self.steps[idx];
            if let Some(tool) = step.tool {
                let satisfied = !step.context.is_empty()
                    || (tool == ToolKind::PublishPost && has_post_record);
                if tool.reads_context() && !satisfied {
                    return Err(PipelineError::Definition(format!(
                        "Step '{}': tool '{}' needs a context step to read from",
                        step.id, tool
                    )));
                }
            }
            if step.output_schema == Some(OutputSchema::PostData) {
                has_post_record = true;
            }
        }
        Ok(())
    }

    /// Topological order of step indices. Among ready steps, the one declared
    /// first runs first, so a linear chain runs exactly as written.
    pub fn execution_order(&self) -> Result<Vec<usize>, PipelineError> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, step) in self.steps.iter().enumerate() {
            if index.insert(step.id.as_str(), i).is_some() {
                return Err(PipelineError::Definition(format!("Duplicate step id '{}'", step.id)));
            }
        }

        let mut deps: Vec<Vec<usize>> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let mut step_deps = Vec::new();
            for dep in &step.context {
                if dep == &step.id {
                    return Err(PipelineError::Definition(format!(
                        "Step '{}' lists itself as context",
                        step.id
                    )));
                }
                let Some(&dep_idx) = index.get(dep.as_str()) else {
                    return Err(PipelineError::Definition(format!(
                        "Step '{}' references unknown step '{}'",
                        step.id, dep
                    )));
                };
                step_deps.push(dep_idx);
            }
            deps.push(step_deps);
        }

        let mut placed: HashSet<usize> = HashSet::new();
        let mut order = Vec::with_capacity(self.steps.len());
        while order.len() < self.steps.len() {
            let next = (0..self.steps.len())
                .find(|i| !placed.contains(i) && deps[*i].iter().all(|d| placed.contains(d)));
            match next {
                Some(i) => {
                    placed.insert(i);
                    order.push(i);
                }
                None => {
                    let stuck: Vec<&str> = (0..self.steps.len())
                        .filter(|i| !placed.contains(i))
                        .map(|i| self.steps[i].id.as_str())
                        .collect();
                    return Err(PipelineError::Definition(format!(
                        "Dependency cycle among steps: {}",
                        stuck.join(", ")
                    )));
                }
            }
        }
        Ok(order)
    }

    /// The built-in blog chain: research → write → illustrate → HTML → JSON → publish.
    pub fn blog_post() -> Self {
        let steps = vec![
            StepDescriptor::agent_step(
                "research_task",
                "researcher",
                "Conduct thorough research about {topic}. Start from the content of {seed_url} \
                 and make sure the notes reflect what that page says.",
                "A list of the most relevant facts about {topic}, as bullet points with short explanations.",
            )
            .with_tool(ToolKind::ScrapeWebsite),
            StepDescriptor::agent_step(
                "writing_task",
                "writer",
                "Using the research notes, write a complete blog post about {topic}. \
                 Use an introduction, sections with headings and a conclusion.",
                "A full blog post in Markdown, without code fences around the whole document.",
            )
            .with_context(&["research_task"])
            .with_output_file("post.md"),
            StepDescriptor::agent_step(
                "image_generation_task",
                "image_designer",
                "Based on the research notes, write one prompt for a header illustration about {topic}.",
                "A single image prompt, one paragraph, no preamble.",
            )
            .with_tool(ToolKind::GenerateImage)
            .with_context(&["research_task"]),
            StepDescriptor::tool_step(
                "image_download_task",
                ToolKind::DownloadImage,
                "Download the generated header image.",
            )
            .with_context(&["image_generation_task"]),
            StepDescriptor::tool_step(
                "image_uploader_task",
                ToolKind::UploadImage,
                "Upload the header image and return its public URL.",
            )
            .with_context(&["image_download_task"]),
            StepDescriptor::agent_step(
                "html_development_task",
                "html_page_developer",
                "Turn the blog post into an HTML fragment. Put the header image at the top \
                 using the public URL ${steps.image_uploader_task.output}.",
                "HTML only, no Markdown and no surrounding code fences.",
            )
            .with_context(&["writing_task", "image_generation_task", "image_uploader_task"])
            .with_output_file("post.html"),
            StepDescriptor::agent_step(
                "json_development_task",
                "json_developer",
                "Produce the post record for publishing. Use a concise title, the full HTML as \
                 content and \"draft\" as status.",
                "A JSON object: {\"title\": string, \"content\": string, \"status\": \"draft\" | \"publish\" | \"pending\"}",
            )
            .with_context(&["html_development_task"])
            .with_schema(OutputSchema::PostData),
            StepDescriptor::tool_step(
                "post_publishing_task",
                ToolKind::PublishPost,
                "Publish the post to WordPress.",
            )
            .with_context(&["json_development_task"]),
        ];

        Self {
            name: "blog_post".to_string(),
            description: Some("Research, write, illustrate and publish a blog post".to_string()),
            steps,
        }
    }
}
