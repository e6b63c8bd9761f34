// src/config/mod.rs

//! Pipeline definitions and parameter sets.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load definitions from disk and resolve references (`loader.rs`).
//! - Validate names and the dependency graph (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    DirReader, ParamsReader, PipelineReader, default_pipeline_path, load_and_validate,
    load_from_path, load_params,
};
pub use model::{
    ParamSet, PipelineDefinition, PipelineSection, RawPipelineDefinition, RunSection, TaskConfig,
};
