//! `scripted run` / `validate` / `agents`: whole-pipeline commands.

use std::path::Path;

use scripted_core::workflow::executor::new_run_id;
use scripted_core::workflow::{AgentLoader, PipelineDefinition, PipelineExecutor, PipelineRun, PipelineServices};
use scripted_core::{PipelineConfig, RunInputs};

use super::{load_config, print_json, truncate};

pub struct RunOptions {
    pub topic: String,
    pub seed_url: String,
    pub pipeline: Option<String>,
    pub agents: Option<String>,
    pub work_dir: String,
    pub unique_image_path: bool,
    pub json: bool,
    pub verbose: bool,
}

/// Run a pipeline end to end.
pub async fn run(options: RunOptions) -> Result<(), String> {
    let config = load_config()?;
    run_with_config(options, config).await.map(|_| ())
}

/// Run with an explicit configuration and return the run record.
pub async fn run_with_config(options: RunOptions, config: PipelineConfig) -> Result<PipelineRun, String> {
    let inputs = RunInputs::new(options.topic, options.seed_url).map_err(|e| e.to_string())?;

    let definition = match &options.pipeline {
        Some(file) => PipelineDefinition::from_file(Path::new(file)).map_err(|e| e.to_string())?,
        None => PipelineDefinition::blog_post(),
    };
    let agents = load_agents(options.agents.as_deref())?;

    let run_id = new_run_id();
    let mut config = config.with_work_dir(&options.work_dir);
    if options.unique_image_path {
        config = config.with_unique_image_path(&run_id);
    }

    println!("📄 Pipeline: {} ({} steps)", definition.name, definition.steps.len());
    println!("   Topic: {}", inputs.topic);
    println!("   Seed URL: {}", inputs.seed_url);
    println!("   Work dir: {}", config.work_dir.display());
    println!();

    let services = PipelineServices::from_config(&config).map_err(|e| e.to_string())?;
    let mut executor = PipelineExecutor::new(services, agents)
        .with_work_dir(config.work_dir.clone())
        .with_run_id(run_id);
    executor.set_verbose(options.verbose);

    let run = executor
        .execute(&definition, &inputs)
        .await
        .map_err(|e| e.to_string())?;

    if options.json {
        let value = serde_json::to_value(&run).map_err(|e| e.to_string())?;
        print_json(&value);
    } else {
        print!("{}", format_summary(&run));
    }

    if run.success {
        println!("\n🎉 Pipeline completed successfully!");
        Ok(run)
    } else {
        Err(format!(
            "Pipeline failed. Failed steps: {}",
            run.failed_steps().join(", ")
        ))
    }
}

/// Per-step summary of a finished run.
pub fn format_summary(run: &PipelineRun) -> String {
    let mut out = format!("\nRun {}\n", run.run_id);
    for (i, step) in run.steps.iter().enumerate() {
        let mark = if step.success {
            "✅"
        } else if step.skipped {
            "⏭ "
        } else {
            "❌"
        };
        out.push_str(&format!("  {mark} {}. {} ({} ms)\n", i + 1, step.step_id, step.duration_ms));
        if let Some(file) = &step.output_file {
            out.push_str(&format!("       → {}\n", file.display()));
        }
        if !step.success && !step.skipped {
            if let Some(error) = &step.error {
                out.push_str(&format!("       {}\n", truncate(error, 200)));
            }
        }
    }
    out
}

/// Validate a pipeline YAML file without executing it.
pub fn validate(file: &str) -> Result<(), String> {
    let definition = PipelineDefinition::from_file(Path::new(file)).map_err(|e| e.to_string())?;
    let order = definition.execution_order().map_err(|e| e.to_string())?;

    println!("✅ Pipeline '{}' is valid", definition.name);
    if let Some(description) = &definition.description {
        println!("   {}", description);
    }
    println!("   Steps: {}", definition.steps.len());

    for (n, idx) in order.iter().enumerate() {
        let step = &definition.steps[*idx];
        let tool = step.tool.map(|t| t.as_str()).unwrap_or("-");
        println!(
            "   {}. {} (agent: {}, tool: {})",
            n + 1,
            step.id,
            step.agent.as_deref().unwrap_or("-"),
            tool
        );
    }
    Ok(())
}

/// List the built-in agents, overridden by any loaded from `agents_file`.
pub fn list_agents(agents_file: Option<&str>) -> Result<(), String> {
    let loader = load_agents(agents_file)?;
    let builtins = AgentLoader::builtin_agents();

    println!("┌──────────────────────┬──────────────────────────────┬──────────┐");
    println!("│ ID                   │ Role                         │ Source   │");
    println!("├──────────────────────┼──────────────────────────────┼──────────┤");
    for agent in loader.all() {
        let source = if builtins.iter().any(|b| b == agent) {
            "builtin"
        } else {
            "file"
        };
        println!(
            "│ {:<20} │ {:<28} │ {:<8} │",
            truncate(&agent.id, 20),
            truncate(&agent.role, 28),
            source
        );
    }
    println!("└──────────────────────┴──────────────────────────────┴──────────┘");
    Ok(())
}

fn load_agents(agents_file: Option<&str>) -> Result<AgentLoader, String> {
    let mut loader = AgentLoader::with_builtins();
    if let Some(file) = agents_file {
        let count = loader.load_file(Path::new(file)).map_err(|e| e.to_string())?;
        tracing::info!("Loaded {} agent(s) from '{}'", count, file);
    }
    Ok(loader)
}
