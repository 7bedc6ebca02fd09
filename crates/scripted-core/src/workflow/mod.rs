//! Pipeline engine: explicit step descriptors run in dependency order.
//!
//! # Architecture
//!
//! ```text
//! pipeline.yaml ──► PipelineDefinition ──► PipelineExecutor
//!   (or blog_post())                          │
//!                    agents.yaml ──────► AgentLoader
//!                                             │
//!                          ┌──────────────────┼──────────────────┐
//!                     AgentCaller        tool adapters      output files
//!                    (LLM over HTTP)   (scrape, image, GCS,  (post.md,
//!                                        WordPress)          post.html)
//! ```

pub mod agent_caller;
pub mod agents;
pub mod executor;
pub mod schema;

pub use agent_caller::{AgentCaller, AgentRequest, AgentResponse, AgentRunner};
pub use agents::{AgentDef, AgentLoader};
pub use executor::{PipelineExecutor, PipelineRun, PipelineServices, StepResult};
pub use schema::{OutputSchema, PipelineDefinition, StepDescriptor, ToolKind};
