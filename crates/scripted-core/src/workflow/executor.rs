//! Pipeline Executor: runs a pipeline definition step by step.
//!
//! The executor:
//! 1. Validates the definition and resolves the dependency order
//! 2. Checks every referenced agent exists (before any step runs)
//! 3. Executes each step sequentially, agent and/or tool
//! 4. Passes output between steps via context lists and template substitution
//! 5. Validates structured output and writes `output_file` artifacts
//! 6. Halts on the first failed step; the rest are recorded as skipped

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use std::time::Instant;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::models::{PostData, RunInputs};
use crate::tools::gcs_uploader::resolve_upload_path;
use crate::tools::{
    http_client, GcsUploader, ImageDownloader, ImageGenerator, OpenAiImageGenerator, WebScraper,
    WordpressPublisher,
};
use crate::workflow::agent_caller::{AgentCaller, AgentRequest, AgentRunner};
use crate::workflow::agents::AgentLoader;
use crate::workflow::schema::{OutputSchema, PipelineDefinition, StepDescriptor, ToolKind};

/// `${steps.<id>.output}` or `{name}`, matched in a single pass.
static TEMPLATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{steps\.([^.}]+)\.output\}|\{([a-z_]+)\}").expect("valid regex")
});
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>)\]]+"#).expect("valid regex"));

/// Fresh identifier for a pipeline run.
pub fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// External collaborators a run talks to.
pub struct PipelineServices {
    pub agents: Arc<dyn AgentRunner>,
    pub images: Arc<dyn ImageGenerator>,
    pub scraper: WebScraper,
    pub downloader: ImageDownloader,
    pub uploader: GcsUploader,
    pub publisher: WordpressPublisher,
}

impl PipelineServices {
    /// Build every adapter from configuration. Credential problems surface
    /// here, before any step runs.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let client = http_client(config.http_timeout, false)?;
        let cms_client = http_client(config.http_timeout, config.wordpress.insecure_tls)?;

        Ok(Self {
            agents: Arc::new(AgentCaller::new(client.clone(), config.llm.clone())),
            images: Arc::new(OpenAiImageGenerator::new(client.clone(), config.image.clone())),
            scraper: WebScraper::new(client.clone(), config.scrape_max_chars),
            downloader: ImageDownloader::new(client.clone(), config.image_output_path.clone()),
            uploader: GcsUploader::from_settings(client, &config.storage)?,
            publisher: WordpressPublisher::from_settings(cms_client, &config.wordpress),
        })
    }
}

/// Result of executing a single step.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub step_id: String,
    pub output: String,
    pub success: bool,
    pub skipped: bool,
    pub error: Option<String>,
    pub output_file: Option<PathBuf>,
    pub duration_ms: u64,
}

impl StepResult {
    fn skipped(step_id: &str) -> Self {
        Self {
            step_id: step_id.to_string(),
            output: String::new(),
            success: false,
            skipped: true,
            error: Some("Skipped: an earlier step failed".to_string()),
            output_file: None,
            duration_ms: 0,
        }
    }
}

/// Result of executing the entire pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub run_id: String,
    pub pipeline: String,
    pub steps: Vec<StepResult>,
    pub success: bool,
    /// The validated record, once the extraction step has run
    pub post: Option<PostData>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineRun {
    pub fn failed_steps(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| !s.success && !s.skipped)
            .map(|s| s.step_id.as_str())
            .collect()
    }
}

/// What a step produced before bookkeeping.
struct StepOutput {
    output: String,
    success: bool,
    error: Option<String>,
}

impl StepOutput {
    fn ok(output: String) -> Self {
        Self {
            output,
            success: true,
            error: None,
        }
    }
}

/// The pipeline executor engine.
pub struct PipelineExecutor {
    services: PipelineServices,
    agents: AgentLoader,
    work_dir: PathBuf,
    run_id: String,
    /// Step outputs indexed by step id
    step_outputs: HashMap<String, String>,
    post: Option<PostData>,
    verbose: bool,
}

impl PipelineExecutor {
    pub fn new(services: PipelineServices, agents: AgentLoader) -> Self {
        Self {
            services,
            agents,
            work_dir: PathBuf::from("."),
            run_id: new_run_id(),
            step_outputs: HashMap::new(),
            post: None,
            verbose: false,
        }
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// Set verbose mode: log a preview of every step output.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Execute a pipeline definition with the given run inputs.
    ///
    /// Definition errors (bad graph, unknown agent) are returned before any
    /// step runs. Step failures are recorded in the returned [`PipelineRun`].
    pub async fn execute(
        &mut self,
        definition: &PipelineDefinition,
        inputs: &RunInputs,
    ) -> Result<PipelineRun, PipelineError> {
        definition.validate()?;
        let order = definition.execution_order()?;
        self.check_agents(definition)?;

        self.step_outputs.clear();
        self.post = None;

        let started_at = Utc::now();
        tracing::info!(
            "[Pipeline] Run {} of '{}' ({} steps, topic: {})",
            self.run_id,
            definition.name,
            definition.steps.len(),
            inputs.topic
        );

        let mut results: Vec<StepResult> = Vec::with_capacity(order.len());
        let mut halted = false;

        for (n, idx) in order.iter().enumerate() {
            let step = &definition.steps[*idx];
            if halted {
                results.push(StepResult::skipped(&step.id));
                continue;
            }

            tracing::info!("[Pipeline] Step {}/{}: {}", n + 1, order.len(), step.id);
            let started = Instant::now();

            let result = match self.execute_step(step, inputs).await {
                Ok(out) => {
                    let output_file = if out.success {
                        match self.write_output_file(step, &out.output).await {
                            Ok(path) => path,
                            Err(e) => {
                                halted = true;
                                results.push(failed(step, e, started));
                                continue;
                            }
                        }
                    } else {
                        None
                    };

                    self.step_outputs.insert(step.id.clone(), out.output.clone());
                    if self.verbose {
                        tracing::info!("[Pipeline] {} output: {}", step.id, truncate(&out.output, 200));
                    }
                    if !out.success {
                        tracing::warn!(
                            "[Pipeline] Step {} failed: {}",
                            step.id,
                            out.error.as_deref().unwrap_or("unknown")
                        );
                        halted = true;
                    }

                    StepResult {
                        step_id: step.id.clone(),
                        output: out.output,
                        success: out.success,
                        skipped: false,
                        error: out.error,
                        output_file,
                        duration_ms: started.elapsed().as_millis() as u64,
                    }
                }
                Err(e) => {
                    halted = true;
                    failed(step, e, started)
                }
            };
            results.push(result);
        }

        let success = results.iter().all(|r| r.success);
        tracing::info!(
            "[Pipeline] Run {} {}: {}/{} steps succeeded",
            self.run_id,
            if success { "completed" } else { "failed" },
            results.iter().filter(|r| r.success).count(),
            results.len()
        );

        Ok(PipelineRun {
            run_id: self.run_id.clone(),
            pipeline: definition.name.clone(),
            steps: results,
            success,
            post: self.post.clone(),
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn check_agents(&self, definition: &PipelineDefinition) -> Result<(), PipelineError> {
        for step in &definition.steps {
            if let Some(agent) = &step.agent {
                if self.agents.get(agent).is_none() {
                    return Err(PipelineError::Definition(format!(
                        "Step '{}' uses unknown agent '{}'. Available: {}",
                        step.id,
                        agent,
                        self.agents.ids().join(", ")
                    )));
                }
            }
        }
        Ok(())
    }

    /// Execute a single step.
    async fn execute_step(
        &mut self,
        step: &StepDescriptor,
        inputs: &RunInputs,
    ) -> Result<StepOutput, PipelineError> {
        let mut out = match step.tool {
            Some(ToolKind::ScrapeWebsite) => {
                let page = self.services.scraper.scrape(&inputs.seed_url).await?;
                let heading = format!("Content of {}", inputs.seed_url);
                StepOutput::ok(self.run_agent(step, inputs, Some((heading.as_str(), page.as_str()))).await?)
            }
            Some(ToolKind::GenerateImage) => {
                let prompt = if step.agent.is_some() {
                    self.run_agent(step, inputs, None).await?
                } else {
                    self.resolve_template(&step.description, inputs)
                };
                StepOutput::ok(self.services.images.generate(prompt.trim()).await?)
            }
            Some(ToolKind::DownloadImage) => {
                let previous = self.context_output(step)?;
                let url = extract_url(previous).ok_or_else(|| {
                    PipelineError::Network(format!(
                        "Step '{}': no image URL found in the output of its context",
                        step.id
                    ))
                })?;
                let path = self.services.downloader.download(&url).await?;
                StepOutput::ok(path.display().to_string())
            }
            Some(ToolKind::UploadImage) => {
                let previous = self.context_output(step)?;
                let path = resolve_upload_path(previous, self.services.downloader.output_path());
                StepOutput::ok(self.services.uploader.upload(&path).await?)
            }
            Some(ToolKind::PublishPost) => {
                let post = match &self.post {
                    Some(post) => post.clone(),
                    None => PostData::from_agent_output(self.context_output(step)?)?,
                };
                let outcome = self.services.publisher.publish_outcome(&post).await;
                let message = outcome.to_string();
                if outcome.is_created() {
                    StepOutput::ok(message)
                } else {
                    StepOutput {
                        output: message.clone(),
                        success: false,
                        error: Some(message),
                    }
                }
            }
            None => StepOutput::ok(self.run_agent(step, inputs, None).await?),
        };

        if let Some(OutputSchema::PostData) = step.output_schema {
            let post = PostData::from_agent_output(&out.output)?;
            out.output = serde_json::to_string_pretty(&post)
                .map_err(|e| PipelineError::Validation(format!("Failed to serialize post: {e}")))?;
            self.post = Some(post);
        }

        Ok(out)
    }

    /// Run the step's agent with its persona, task and context.
    async fn run_agent(
        &self,
        step: &StepDescriptor,
        inputs: &RunInputs,
        extra_context: Option<(&str, &str)>,
    ) -> Result<String, PipelineError> {
        let agent_id = step.agent.as_deref().ok_or_else(|| {
            PipelineError::Definition(format!("Step '{}' has no agent", step.id))
        })?;
        let agent = self.agents.get(agent_id).ok_or_else(|| {
            PipelineError::Definition(format!("Unknown agent '{agent_id}'"))
        })?;

        let request = AgentRequest {
            agent_id: agent.id.clone(),
            model: agent.model.clone(),
            system_prompt: agent.system_prompt(|s| self.resolve_template(s, inputs)),
            user_prompt: self.build_user_prompt(step, inputs, extra_context),
        };

        let response = self.services.agents.run(&request).await?;
        if let Some(usage) = &response.usage {
            tracing::debug!(
                "[Pipeline] {} tokens: {:?} in / {:?} out",
                step.id,
                usage.input_tokens,
                usage.output_tokens
            );
        }
        Ok(response.content)
    }

    /// Build the user prompt for an agent step.
    fn build_user_prompt(
        &self,
        step: &StepDescriptor,
        inputs: &RunInputs,
        extra_context: Option<(&str, &str)>,
    ) -> String {
        let mut prompt = self.resolve_template(&step.description, inputs);

        if !step.expected_output.trim().is_empty() {
            if !prompt.is_empty() {
                prompt.push_str("\n\n");
            }
            prompt.push_str("## Expected Output\n\n");
            prompt.push_str(&self.resolve_template(&step.expected_output, inputs));
        }

        let mut sections: Vec<(String, &str)> = Vec::new();
        if let Some((heading, body)) = extra_context {
            sections.push((heading.to_string(), body));
        }
        for dep in &step.context {
            if let Some(output) = self.step_outputs.get(dep) {
                sections.push((format!("Output of `{dep}`"), output.as_str()));
            }
        }
        if !sections.is_empty() {
            prompt.push_str("\n\n## Context\n");
            for (heading, body) in sections {
                prompt.push_str(&format!("\n### {heading}\n\n{body}\n"));
            }
        }

        if prompt.trim().is_empty() {
            prompt = format!("Complete the '{}' step for the topic: {}", step.id, inputs.topic);
        }
        prompt
    }

    /// Output of the last context step, which tool steps consume.
    fn context_output(&self, step: &StepDescriptor) -> Result<&str, PipelineError> {
        let dep = step.context.last().ok_or_else(|| {
            PipelineError::Definition(format!("Step '{}' needs a context step to read from", step.id))
        })?;
        self.step_outputs
            .get(dep)
            .map(|s| s.as_str())
            .ok_or_else(|| PipelineError::Definition(format!("Step '{}' ran before '{}'", step.id, dep)))
    }

    async fn write_output_file(
        &self,
        step: &StepDescriptor,
        output: &str,
    ) -> Result<Option<PathBuf>, PipelineError> {
        let Some(file) = &step.output_file else {
            return Ok(None);
        };
        let path = self.work_dir.join(file);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, output).await?;
        tracing::info!("[Pipeline] Wrote {} ({} bytes)", path.display(), output.len());
        Ok(Some(path))
    }

    /// Resolve template variables in a string.
    ///
    /// Supported patterns:
    /// - `{topic}`, `{seed_url}`: run inputs
    /// - `${steps.<id>.output}`: output of an earlier step
    ///
    /// Unknown references are left untouched. Substituted text is never
    /// rescanned, so braces inside a step output or input stay literal.
    fn resolve_template(&self, template: &str, inputs: &RunInputs) -> String {
        TEMPLATE_RE
            .replace_all(template, |caps: &regex::Captures| {
                let value = match (caps.get(1), caps.get(2)) {
                    (Some(step), _) => self.step_outputs.get(step.as_str()).map(|s| s.as_str()),
                    (None, Some(name)) => inputs.lookup(name.as_str()),
                    (None, None) => None,
                };
                value.unwrap_or(&caps[0]).to_string()
            })
            .to_string()
    }
}

fn failed(step: &StepDescriptor, error: PipelineError, started: Instant) -> StepResult {
    tracing::warn!("[Pipeline] Step {} failed ({}): {}", step.id, error.kind(), error);
    StepResult {
        step_id: step.id.clone(),
        output: String::new(),
        success: false,
        skipped: false,
        error: Some(error.to_string()),
        output_file: None,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

/// First http(s) URL in an agent or tool output.
pub fn extract_url(text: &str) -> Option<String> {
    URL_RE
        .find(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';']).to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
