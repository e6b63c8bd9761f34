// src/schema/convert.rs

//! Conversions between the persisted representation and the graph / state
//! machine types.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::dag::{DependencyGraph, GraphBuilder};
use crate::errors::{PipelineRunError, Result};
use crate::schema::pipeline_run::{
    ObjectReference, PipelineRunCondition, PipelineRunStatus, PipelineTaskRun,
    PipelineTaskRunRef, TaskRunOutcome,
};
use crate::status::{Condition, Conditions, RunTracker, TaskRunState};
use crate::types::TaskName;

impl From<&Condition> for PipelineRunCondition {
    fn from(c: &Condition) -> Self {
        Self {
            condition_type: c.condition_type,
            status: c.status,
            last_transition_time: c.last_transition_time,
            reason: c.reason.clone().unwrap_or_default(),
            message: c.message.clone().unwrap_or_default(),
        }
    }
}

impl From<&PipelineRunCondition> for Condition {
    fn from(c: &PipelineRunCondition) -> Self {
        Self {
            condition_type: c.condition_type,
            status: c.status,
            last_transition_time: c.last_transition_time,
            reason: non_empty(&c.reason),
            message: non_empty(&c.message),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

impl From<(&str, &TaskRunState)> for PipelineTaskRun {
    fn from((name, state): (&str, &TaskRunState)) -> Self {
        let mut run = PipelineTaskRun::running(name);
        match state {
            TaskRunState::Pending | TaskRunState::Running => {}
            TaskRunState::Succeeded => run.outcome = Some(TaskRunOutcome::Succeeded),
            TaskRunState::Failed { message } => {
                run.outcome = Some(TaskRunOutcome::Failed);
                run.message = message.clone();
            }
            TaskRunState::Blocked { by } => {
                run.outcome = Some(TaskRunOutcome::Blocked);
                run.blocked_by = by.clone();
            }
        }
        run
    }
}

impl From<&PipelineTaskRun> for TaskRunState {
    fn from(run: &PipelineTaskRun) -> Self {
        match run.outcome {
            None => TaskRunState::Running,
            Some(TaskRunOutcome::Succeeded) => TaskRunState::Succeeded,
            Some(TaskRunOutcome::Failed) => TaskRunState::Failed {
                message: run.message.clone(),
            },
            Some(TaskRunOutcome::Blocked) => TaskRunState::Blocked {
                by: run.blocked_by.clone(),
            },
        }
    }
}

impl From<&RunTracker> for PipelineRunStatus {
    fn from(tracker: &RunTracker) -> Self {
        Self {
            task_runs: tracker.task_runs().map(PipelineTaskRun::from).collect(),
            conditions: tracker
                .conditions()
                .iter()
                .map(PipelineRunCondition::from)
                .collect(),
        }
    }
}

impl PipelineRunStatus {
    /// Persisted conditions as a domain condition set.
    pub fn to_conditions(&self) -> Result<Conditions> {
        Conditions::from_vec(self.conditions.iter().map(Condition::from).collect())
    }

    /// Continue a run from this snapshot over the given graph.
    pub fn restore_tracker(
        &self,
        graph: Arc<DependencyGraph>,
        now: DateTime<Utc>,
    ) -> Result<RunTracker> {
        let task_runs: Vec<(TaskName, TaskRunState)> = self
            .task_runs
            .iter()
            .map(|r| (r.name.clone(), TaskRunState::from(r)))
            .collect();
        RunTracker::restore(graph, task_runs, self.to_conditions()?, now)
    }
}

/// Build and validate a graph from persisted node wrappers.
///
/// Unlike building from declarations, both sides of every edge must already
/// be present: `A.nextTasks` contains `B` iff `B.prevTasks` contains `A`.
pub fn graph_from_refs(refs: &[PipelineTaskRunRef]) -> Result<DependencyGraph> {
    let mut names: HashSet<&str> = HashSet::with_capacity(refs.len());
    for node in refs {
        if !names.insert(node.task_run.name.as_str()) {
            return Err(PipelineRunError::DuplicateTask(node.task_run.name.clone()));
        }
    }

    let mut forward: HashSet<(&str, &str)> = HashSet::new();
    let mut backward: HashSet<(&str, &str)> = HashSet::new();
    for node in refs {
        let this = node.task_run.name.as_str();
        for next in &node.next_tasks {
            check_declared(&names, this, &next.name)?;
            forward.insert((this, next.name.as_str()));
        }
        for prev in &node.prev_tasks {
            check_declared(&names, this, &prev.name)?;
            backward.insert((prev.name.as_str(), this));
        }
    }

    // Report in declaration order so the error is deterministic.
    for node in refs {
        let this = node.task_run.name.as_str();
        for next in &node.next_tasks {
            if !backward.contains(&(this, next.name.as_str())) {
                return Err(asymmetric(this, &next.name));
            }
        }
        for prev in &node.prev_tasks {
            if !forward.contains(&(prev.name.as_str(), this)) {
                return Err(asymmetric(&prev.name, this));
            }
        }
    }

    let mut builder = GraphBuilder::new();
    for node in refs {
        let prev: Vec<&str> = node.prev_tasks.iter().map(|r| r.name.as_str()).collect();
        builder.add_task(&node.task_run.name, &prev, &[])?;
    }
    let graph = builder.build()?;
    graph.validate()?;
    Ok(graph)
}

fn check_declared(names: &HashSet<&str>, task: &str, reference: &str) -> Result<()> {
    if names.contains(reference) {
        Ok(())
    } else {
        Err(PipelineRunError::DanglingReference {
            task: task.to_string(),
            reference: reference.to_string(),
        })
    }
}

fn asymmetric(from: &str, to: &str) -> PipelineRunError {
    PipelineRunError::AsymmetricEdge {
        from: from.to_string(),
        to: to.to_string(),
    }
}

/// Persisted node wrappers for every task, in declaration order.
pub fn refs_from_graph(graph: &DependencyGraph) -> Vec<PipelineTaskRunRef> {
    graph
        .handles()
        .map(|h| PipelineTaskRunRef {
            task_run: ObjectReference::new(graph.name(h)),
            next_tasks: graph
                .next_handles(h)
                .map(|n| ObjectReference::new(graph.name(n)))
                .collect(),
            prev_tasks: graph
                .prev_handles(h)
                .map(|p| ObjectReference::new(graph.name(p)))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, prev: &[&str], next: &[&str]) -> PipelineTaskRunRef {
        PipelineTaskRunRef {
            task_run: ObjectReference::new(name),
            next_tasks: next.iter().map(|n| ObjectReference::new(*n)).collect(),
            prev_tasks: prev.iter().map(|p| ObjectReference::new(*p)).collect(),
        }
    }

    #[test]
    fn symmetric_refs_build_a_graph() {
        let refs = vec![
            node("A", &[], &["B"]),
            node("B", &["A"], &["C"]),
            node("C", &["B"], &[]),
        ];
        let g = graph_from_refs(&refs).unwrap();
        assert_eq!(g.topological_order().unwrap(), vec!["A", "B", "C"]);
        assert_eq!(refs_from_graph(&g), refs);
    }

    #[test]
    fn missing_inverse_is_asymmetric() {
        let refs = vec![node("A", &[], &["B"]), node("B", &[], &[])];
        match graph_from_refs(&refs) {
            Err(PipelineRunError::AsymmetricEdge { from, to }) => {
                assert_eq!((from.as_str(), to.as_str()), ("A", "B"));
            }
            other => panic!("expected AsymmetricEdge, got {other:?}"),
        }
    }

    #[test]
    fn unknown_neighbour_is_dangling() {
        let refs = vec![node("A", &["ghost"], &[])];
        assert!(matches!(
            graph_from_refs(&refs),
            Err(PipelineRunError::DanglingReference { .. })
        ));
    }

    #[test]
    fn symmetric_cycle_is_still_rejected() {
        let refs = vec![node("A", &["B"], &["B"]), node("B", &["A"], &["A"])];
        assert!(matches!(
            graph_from_refs(&refs),
            Err(PipelineRunError::CycleDetected { .. })
        ));
    }
}
