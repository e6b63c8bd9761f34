// src/config/validate.rs

use crate::config::model::{PipelineDefinition, RawPipelineDefinition};
use crate::dag::{DependencyGraph, GraphBuilder};
use crate::errors::{PipelineRunError, Result};

impl TryFrom<RawPipelineDefinition> for PipelineDefinition {
    type Error = PipelineRunError;

    fn try_from(raw: RawPipelineDefinition) -> std::result::Result<Self, Self::Error> {
        ensure_has_name(&raw)?;
        ensure_has_tasks(&raw)?;
        let graph = raw.build_graph()?;
        graph.validate()?;
        Ok(PipelineDefinition::new_unchecked(raw, graph))
    }
}

impl RawPipelineDefinition {
    /// Declare every task in one build pass.
    ///
    /// Reports duplicate and dangling names but not cycles; callers decide
    /// whether structural errors abort loading or become a failed run.
    pub fn build_graph(&self) -> Result<DependencyGraph> {
        let mut builder = GraphBuilder::new();
        for task in &self.task {
            let after: Vec<&str> = task.after.iter().map(String::as_str).collect();
            let before: Vec<&str> = task.before.iter().map(String::as_str).collect();
            builder.add_task(&task.name, &after, &before)?;
        }
        builder.build()
    }
}

fn ensure_has_name(raw: &RawPipelineDefinition) -> Result<()> {
    if raw.pipeline.name.trim().is_empty() {
        return Err(PipelineRunError::ConfigError(
            "[pipeline].name must not be empty".to_string(),
        ));
    }
    if let Some(task) = raw.task.iter().find(|t| t.name.trim().is_empty()) {
        return Err(PipelineRunError::ConfigError(format!(
            "task with after = {:?} has an empty name",
            task.after
        )));
    }
    Ok(())
}

fn ensure_has_tasks(raw: &RawPipelineDefinition) -> Result<()> {
    if raw.task.is_empty() {
        return Err(PipelineRunError::ConfigError(
            "pipeline must contain at least one [[task]] entry".to_string(),
        ));
    }
    Ok(())
}
