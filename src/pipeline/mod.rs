// src/pipeline/mod.rs

pub mod batch;
pub mod clip_pipeline;
pub mod metrics;

pub use batch::{run_batch, BatchOptions};
pub use clip_pipeline::ClipRun;
