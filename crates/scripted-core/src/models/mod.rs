//! Data models shared across the pipeline.

pub mod post_data;
pub mod run;

pub use post_data::{PostData, PostStatus};
pub use run::RunInputs;
