//! Scripted Core: domain logic for the content pipeline.
//!
//! A run researches a topic, drafts a post, produces and hosts an
//! illustration, assembles HTML, extracts a validated [`PostData`] record
//! and publishes it to WordPress. This crate contains:
//!
//! - `models`: run inputs and the structured post record
//! - `config`: environment-driven configuration
//! - `tools`: thin HTTP adapters (download, storage upload, CMS publish, ...)
//! - `workflow`: step descriptors, agent definitions and the sequential executor
//!
//! It has no CLI dependency and can be embedded in other front-ends.

pub mod config;
pub mod error;
pub mod models;
pub mod tools;
pub mod workflow;

// Convenience re-exports
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use models::{PostData, PostStatus, RunInputs};
