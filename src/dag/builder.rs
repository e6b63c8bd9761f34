// src/dag/builder.rs

//! Single-pass graph construction with forward references.

use std::collections::HashSet;

use tracing::debug;

use crate::dag::graph::DependencyGraph;
use crate::errors::{PipelineRunError, Result};
use crate::types::TaskName;

#[derive(Debug, Clone)]
struct Declaration {
    name: TaskName,
    prev: Vec<TaskName>,
    next: Vec<TaskName>,
}

/// Collects task declarations for one build pass.
///
/// Unlike [`DependencyGraph::add_task`], references may point at tasks that
/// are declared later in the same pass; they are resolved in [`build`].
///
/// [`build`]: GraphBuilder::build
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    declarations: Vec<Declaration>,
    seen: HashSet<TaskName>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&mut self, name: &str, prev: &[&str], next: &[&str]) -> Result<&mut Self> {
        if !self.seen.insert(name.to_string()) {
            return Err(PipelineRunError::DuplicateTask(name.to_string()));
        }

        self.declarations.push(Declaration {
            name: name.to_string(),
            prev: prev.iter().map(|s| s.to_string()).collect(),
            next: next.iter().map(|s| s.to_string()).collect(),
        });
        Ok(self)
    }

    /// Resolve all references and produce the graph.
    ///
    /// Does not check for cycles; call [`DependencyGraph::validate`] before
    /// trusting the graph for scheduling.
    pub fn build(self) -> Result<DependencyGraph> {
        let mut graph = DependencyGraph::new();
        for decl in &self.declarations {
            graph.insert_node(&decl.name);
        }

        for decl in &self.declarations {
            let this = graph
                .handle(&decl.name)
                .ok_or_else(|| PipelineRunError::TaskNotFound(decl.name.clone()))?;

            for reference in &decl.prev {
                let prev = resolve(&graph, &decl.name, reference)?;
                graph.insert_edge(prev, this);
            }
            for reference in &decl.next {
                let next = resolve(&graph, &decl.name, reference)?;
                graph.insert_edge(this, next);
            }
        }

        debug!(
            tasks = graph.len(),
            edges = graph.edges().len(),
            "dependency graph built"
        );
        Ok(graph)
    }
}

fn resolve(
    graph: &DependencyGraph,
    task: &str,
    reference: &str,
) -> Result<crate::dag::TaskHandle> {
    graph
        .handle(reference)
        .ok_or_else(|| PipelineRunError::DanglingReference {
            task: task.to_string(),
            reference: reference.to_string(),
        })
}
