// src/config/mod.rs
pub mod pipeline;

pub use pipeline::{DemoConfig, HeuristicConfig, PipelineConfig};
