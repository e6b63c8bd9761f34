// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ParamSet, PipelineDefinition, RawPipelineDefinition};
use crate::errors::{PipelineRunError, Result};
use crate::schema::{PipelineParamsRef, PipelineRef};

/// Load a pipeline definition without semantic validation.
///
/// Use [`load_and_validate`] unless structural errors should be turned into
/// a failed run instead of a load error.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPipelineDefinition> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let raw: RawPipelineDefinition = toml::from_str(&contents)?;
    debug!(path = %path.display(), tasks = raw.task.len(), "pipeline definition loaded");
    Ok(raw)
}

/// Load a pipeline definition and validate names and the dependency graph.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PipelineDefinition> {
    let raw = load_from_path(&path)?;
    PipelineDefinition::try_from(raw)
}

pub fn load_params(path: impl AsRef<Path>) -> Result<ParamSet> {
    let contents = fs::read_to_string(path.as_ref())?;
    Ok(toml::from_str(&contents)?)
}

/// Default pipeline definition path: `Pipeline.toml` in the working directory.
pub fn default_pipeline_path() -> PathBuf {
    PathBuf::from("Pipeline.toml")
}

/// Resolves a `pipelineRef` to a pipeline definition.
pub trait PipelineReader {
    fn read_pipeline(&self, pipeline_ref: &PipelineRef) -> Result<RawPipelineDefinition>;
}

/// Resolves a `pipelineParamsRef` to a parameter set.
pub trait ParamsReader {
    fn read_params(&self, params_ref: &PipelineParamsRef) -> Result<ParamSet>;
}

/// Reads `<root>/<name>.toml` for pipelines and `<root>/<name>.params.toml`
/// for parameter sets.
#[derive(Debug, Clone)]
pub struct DirReader {
    root: PathBuf,
}

impl DirReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, name: &str, suffix: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
            return Err(PipelineRunError::ConfigError(format!(
                "invalid reference name '{name}'"
            )));
        }
        Ok(self.root.join(format!("{name}{suffix}")))
    }
}

impl PipelineReader for DirReader {
    fn read_pipeline(&self, pipeline_ref: &PipelineRef) -> Result<RawPipelineDefinition> {
        load_from_path(self.path_for(&pipeline_ref.name, ".toml")?)
    }
}

impl ParamsReader for DirReader {
    fn read_params(&self, params_ref: &PipelineParamsRef) -> Result<ParamSet> {
        // An unnamed parameter set is empty.
        if params_ref.name.is_empty() {
            return Ok(ParamSet::default());
        }
        load_params(self.path_for(&params_ref.name, ".params.toml")?)
    }
}
