//! Scripted CLI: research a topic, write a post, illustrate it and publish
//! it to WordPress.
//!
//! All pipeline logic lives in scripted-core; this binary parses arguments,
//! sets up logging and prints summaries.

use clap::{Parser, Subcommand};
use scripted_cli::commands;

/// Scripted: blog post pipeline
#[derive(Parser)]
#[command(name = "scripted", version, about = "Scripted: research, write, illustrate and publish a blog post")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline for a topic
    Run {
        /// Topic the post is about
        #[arg(long)]
        topic: String,
        /// Page the research step scrapes first
        #[arg(long, env = "SEED_URL")]
        seed_url: String,
        /// Pipeline YAML file (defaults to the built-in blog pipeline)
        #[arg(long)]
        pipeline: Option<String>,
        /// Agent definitions YAML; entries override the built-in agents
        #[arg(long)]
        agents: Option<String>,
        /// Directory receiving post.md, post.html and the header image
        #[arg(long, default_value = ".")]
        work_dir: String,
        /// Name the image file after the run id instead of reusing one path
        #[arg(long)]
        unique_image_path: bool,
        /// Print the full run record as JSON when done
        #[arg(long)]
        json: bool,
        /// Log a preview of every step output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a pipeline YAML file without running it
    Validate {
        /// Path to the pipeline YAML file
        file: String,
    },

    /// List agent definitions
    Agents {
        /// Agent definitions YAML to load on top of the built-ins
        #[arg(long)]
        agents: Option<String>,
    },

    /// Download an image to the configured output path
    Download {
        /// Image URL
        url: String,
        /// Destination file
        #[arg(long, env = "IMAGE_OUTPUT_PATH", default_value = "header.png")]
        output: String,
    },

    /// Upload a local PNG to the configured bucket and print its public URL
    Upload {
        /// Local file to upload
        path: String,
    },

    /// Create a post on the configured WordPress site
    Publish {
        #[arg(long)]
        title: String,
        /// HTML body of the post
        #[arg(long)]
        content: String,
        /// draft, publish or pending
        #[arg(long, default_value = "draft")]
        status: String,
    },
}

#[tokio::main]
async fn main() {
    // `.env` values feed clap's `env` fallbacks too
    scripted_core::config::load_dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scripted_core=info,scripted_cli=info".into()),
        )
        .init();

    let result = match cli.command {
        Some(Commands::Run {
            topic,
            seed_url,
            pipeline,
            agents,
            work_dir,
            unique_image_path,
            json,
            verbose,
        }) => {
            commands::pipeline::run(commands::pipeline::RunOptions {
                topic,
                seed_url,
                pipeline,
                agents,
                work_dir,
                unique_image_path,
                json,
                verbose,
            })
            .await
        }
        Some(Commands::Validate { file }) => commands::pipeline::validate(&file),
        Some(Commands::Agents { agents }) => commands::pipeline::list_agents(agents.as_deref()),
        Some(Commands::Download { url, output }) => commands::tools::download(&url, &output).await,
        Some(Commands::Upload { path }) => commands::tools::upload(&path).await,
        Some(Commands::Publish {
            title,
            content,
            status,
        }) => commands::tools::publish(&title, &content, &status).await,
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
