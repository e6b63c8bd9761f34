#![allow(dead_code)]

use pipelinerun::config::{
    PipelineDefinition, PipelineSection, RawPipelineDefinition, RunSection, TaskConfig,
};
use pipelinerun::dag::{DependencyGraph, GraphBuilder};

/// Builder for `RawPipelineDefinition` to simplify test setup.
pub struct DefinitionBuilder {
    raw: RawPipelineDefinition,
}

impl DefinitionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            raw: RawPipelineDefinition {
                pipeline: PipelineSection {
                    name: name.to_string(),
                    api_version: String::new(),
                },
                run: RunSection::default(),
                task: Vec::new(),
            },
        }
    }

    /// Declare a task that runs after `after`.
    pub fn task(mut self, name: &str, after: &[&str]) -> Self {
        self.raw.task.push(TaskConfig {
            name: name.to_string(),
            after: after.iter().map(|s| s.to_string()).collect(),
            before: Vec::new(),
        });
        self
    }

    /// Declare a task with both predecessor and successor lists.
    pub fn task_with(mut self, name: &str, after: &[&str], before: &[&str]) -> Self {
        self.raw.task.push(TaskConfig {
            name: name.to_string(),
            after: after.iter().map(|s| s.to_string()).collect(),
            before: before.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn params(mut self, name: &str) -> Self {
        self.raw.run.params = Some(name.to_string());
        self
    }

    pub fn raw(self) -> RawPipelineDefinition {
        self.raw
    }

    pub fn build(self) -> PipelineDefinition {
        PipelineDefinition::try_from(self.raw).expect("Failed to build valid pipeline from builder")
    }
}

/// Build a graph from `(task, prev)` pairs in declaration order.
pub fn graph(tasks: &[(&str, &[&str])]) -> DependencyGraph {
    let mut builder = GraphBuilder::new();
    for (name, prev) in tasks {
        builder.add_task(name, prev, &[]).expect("unique task names");
    }
    builder.build().expect("every referenced task declared")
}

/// `A -> B -> C`
pub fn chain_abc() -> DependencyGraph {
    graph(&[("A", &[]), ("B", &["A"]), ("C", &["B"])])
}

/// `A -> {B, C} -> D`
pub fn diamond() -> DependencyGraph {
    graph(&[("A", &[]), ("B", &["A"]), ("C", &["A"]), ("D", &["B", "C"])])
}
