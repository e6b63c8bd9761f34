use std::collections::HashMap;

use pipelinerun::config::{ParamSet, ParamsReader, PipelineReader, RawPipelineDefinition};
use pipelinerun::errors::{PipelineRunError, Result};
use pipelinerun::schema::{PipelineParamsRef, PipelineRef};

/// In-memory pipeline and parameter lookup keyed by reference name.
#[derive(Default)]
pub struct FakeReader {
    pipelines: HashMap<String, RawPipelineDefinition>,
    params: HashMap<String, ParamSet>,
}

impl FakeReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pipeline(mut self, name: &str, definition: RawPipelineDefinition) -> Self {
        self.pipelines.insert(name.to_string(), definition);
        self
    }

    pub fn with_params(mut self, name: &str, params: &[(&str, &str)]) -> Self {
        let mut set = ParamSet::default();
        for (k, v) in params {
            set.params.insert(k.to_string(), v.to_string());
        }
        self.params.insert(name.to_string(), set);
        self
    }
}

impl PipelineReader for FakeReader {
    fn read_pipeline(&self, pipeline_ref: &PipelineRef) -> Result<RawPipelineDefinition> {
        self.pipelines
            .get(&pipeline_ref.name)
            .cloned()
            .ok_or_else(|| PipelineRunError::ConfigError(format!("no pipeline '{}'", pipeline_ref.name)))
    }
}

impl ParamsReader for FakeReader {
    fn read_params(&self, params_ref: &PipelineParamsRef) -> Result<ParamSet> {
        if params_ref.name.is_empty() {
            return Ok(ParamSet::default());
        }
        self.params
            .get(&params_ref.name)
            .cloned()
            .ok_or_else(|| PipelineRunError::ConfigError(format!("no params '{}'", params_ref.name)))
    }
}
