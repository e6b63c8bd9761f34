// src/config/model.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::dag::DependencyGraph;
use crate::types::TriggerType;

/// Pipeline definition as read from a TOML file, before validation.
///
/// ```toml
/// [pipeline]
/// name = "build-and-deploy"
///
/// [run]
/// params = "staging"
///
/// [[task]]
/// name = "build"
///
/// [[task]]
/// name = "test"
/// after = ["build"]
///
/// [[task]]
/// name = "deploy"
/// after = ["test"]
/// ```
///
/// Tasks are an array of tables so that declaration order is preserved; the
/// first failed task of a run is chosen by that order.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPipelineDefinition {
    pub pipeline: PipelineSection,

    /// Defaults for runs created from this definition.
    #[serde(default)]
    pub run: RunSection,

    #[serde(default)]
    pub task: Vec<TaskConfig>,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    pub name: String,

    /// API version written on references to this pipeline; empty means
    /// "same as the run".
    #[serde(default)]
    pub api_version: String,
}

/// `[run]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunSection {
    /// Name of the parameter set passed as `pipelineParamsRef`.
    #[serde(default)]
    pub params: Option<String>,

    #[serde(default)]
    pub trigger: TriggerType,

    /// Name of whoever or whatever triggered the run.
    #[serde(default)]
    pub trigger_name: Option<String>,
}

/// `[[task]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    pub name: String,

    /// Tasks that must succeed before this one starts (`prevTasks`).
    #[serde(default)]
    pub after: Vec<String>,

    /// Tasks that may only start after this one succeeded (`nextTasks`).
    #[serde(default)]
    pub before: Vec<String>,
}

/// A validated pipeline definition with its dependency graph.
#[derive(Debug, Clone)]
pub struct PipelineDefinition {
    pub pipeline: PipelineSection,
    pub run: RunSection,
    pub task: Vec<TaskConfig>,
    pub graph: Arc<DependencyGraph>,
}

impl PipelineDefinition {
    pub(crate) fn new_unchecked(raw: RawPipelineDefinition, graph: DependencyGraph) -> Self {
        Self {
            pipeline: raw.pipeline,
            run: raw.run,
            task: raw.task,
            graph: Arc::new(graph),
        }
    }
}

/// Parameter set resolved from a `pipelineParamsRef`.
///
/// ```toml
/// [params]
/// region = "eu-west-1"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ParamSet {
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl ParamSet {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}
