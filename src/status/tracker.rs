// src/status/tracker.rs

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::dag::{DependencyGraph, TaskHandle};
use crate::errors::{PipelineRunError, Result};
use crate::status::condition::Conditions;
use crate::status::phase::{REASON_INVALID_GRAPH, RunPhase, TaskRunState};
use crate::types::{ConditionStatus, ConditionType, TaskName, TaskOutcome};

/// Structured result of one tracker transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerStep {
    /// Tasks admitted for execution by this step.
    pub admitted: Vec<TaskName>,
    /// Tasks newly marked as blocked by a failed predecessor.
    pub blocked: Vec<TaskName>,
    /// Whether this step completed the run.
    pub run_just_completed: bool,
}

/// Status state machine for one pipeline run.
///
/// Owns the validated graph (shared, never mutated), the per-task state and
/// the condition set. All methods are synchronous and bounded by the size of
/// the graph. One logical owner drives a tracker; readers work from the
/// persisted snapshots produced by [`crate::schema`].
#[derive(Debug, Clone)]
pub struct RunTracker {
    graph: Arc<DependencyGraph>,
    states: Vec<TaskRunState>,
    /// Task runs in the order they entered the run (admitted or blocked).
    task_runs: Vec<TaskHandle>,
    phase: RunPhase,
    conditions: Conditions,
}

impl RunTracker {
    /// Create a tracker for a freshly built graph.
    ///
    /// A graph that fails validation puts the run straight into the terminal
    /// [`RunPhase::InvalidGraph`] state.
    pub fn new(graph: Arc<DependencyGraph>, now: DateTime<Utc>) -> Self {
        let validation = graph.validate();
        let mut tracker = Self::blank(graph);

        match validation {
            Ok(()) => tracker.sync_conditions(now),
            Err(err) => tracker.enter_invalid(&err, now),
        }
        tracker
    }

    /// Terminal tracker for a structural error found while building the graph.
    pub fn invalid(error: &PipelineRunError, now: DateTime<Utc>) -> Self {
        let mut tracker = Self::blank(Arc::new(DependencyGraph::new()));
        tracker.enter_invalid(error, now);
        tracker
    }

    /// Rebuild a tracker from persisted task runs and conditions.
    ///
    /// Fails if the persisted state names unknown tasks, lists a task twice,
    /// breaks dependency order or carries conditions that contradict the
    /// task outcomes. Pending tasks downstream of a failure are blocked, as
    /// they would have been when the failure was recorded.
    pub fn restore(
        graph: Arc<DependencyGraph>,
        task_runs: Vec<(TaskName, TaskRunState)>,
        conditions: Conditions,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let invalid_graph_message = conditions
            .get(ConditionType::Succeeded)
            .filter(|c| c.reason.as_deref() == Some(REASON_INVALID_GRAPH))
            .map(|c| c.message.clone().unwrap_or_default());

        let validation = graph.validate();
        let mut tracker = Self::blank(graph);
        tracker.conditions = conditions;

        if let Some(message) = invalid_graph_message {
            tracker.phase = RunPhase::InvalidGraph { message };
            tracker.apply_projection(now)?;
            return Ok(tracker);
        }
        if let Err(err) = validation {
            tracker.enter_invalid(&err, now);
            return Ok(tracker);
        }

        for (name, state) in task_runs {
            let handle = tracker
                .graph
                .handle(&name)
                .ok_or_else(|| PipelineRunError::TaskNotFound(name.clone()))?;
            if tracker.states[handle.index()] != TaskRunState::Pending {
                return Err(PipelineRunError::InvalidStatus(format!(
                    "task run '{name}' is listed more than once"
                )));
            }
            if state == TaskRunState::Pending {
                return Err(PipelineRunError::InvalidStatus(format!(
                    "task run '{name}' is listed but was never admitted"
                )));
            }
            tracker.states[handle.index()] = state;
            tracker.task_runs.push(handle);
        }
        tracker.check_dependency_order()?;
        tracker.block_stranded_tasks();

        if tracker.task_runs.iter().any(|h| {
            !matches!(tracker.states[h.index()], TaskRunState::Blocked { .. })
        }) {
            tracker.phase = RunPhase::Running;
        }
        tracker.finish_if_complete();
        tracker.apply_projection(now)?;

        debug!(
            phase = %tracker.phase,
            task_runs = tracker.task_runs.len(),
            "tracker restored from persisted status"
        );
        Ok(tracker)
    }

    /// A task may only have left `Pending` once every predecessor
    /// succeeded, or by being blocked from a failed upstream task.
    fn check_dependency_order(&self) -> Result<()> {
        let graph = &self.graph;
        for handle in graph.handles() {
            let name = graph.name(handle);
            match &self.states[handle.index()] {
                TaskRunState::Pending => {}
                TaskRunState::Blocked { by } => {
                    let upstream_failure = graph.handle(by).is_some_and(|b| {
                        matches!(self.states[b.index()], TaskRunState::Failed { .. })
                            && graph.downstream_of(b).contains(&handle)
                    });
                    if !upstream_failure {
                        return Err(PipelineRunError::InvalidStatus(format!(
                            "task run '{name}' is blocked by '{by}', which is not a failed upstream task"
                        )));
                    }
                }
                state => {
                    if let Some(prev) = graph
                        .prev_handles(handle)
                        .find(|p| self.states[p.index()] != TaskRunState::Succeeded)
                    {
                        return Err(PipelineRunError::InvalidStatus(format!(
                            "task run '{name}' is {} but its dependency '{}' is {}",
                            state.label(),
                            graph.name(prev),
                            self.states[prev.index()].label()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn block_stranded_tasks(&mut self) {
        let graph = Arc::clone(&self.graph);
        for failed in graph.handles() {
            if !matches!(self.states[failed.index()], TaskRunState::Failed { .. }) {
                continue;
            }
            for downstream in graph.downstream_of(failed) {
                if self.states[downstream.index()] == TaskRunState::Pending {
                    debug!(
                        task = %graph.name(downstream),
                        by = %graph.name(failed),
                        "restored task run blocked by failed dependency"
                    );
                    self.states[downstream.index()] = TaskRunState::Blocked {
                        by: graph.name(failed).to_string(),
                    };
                    self.task_runs.push(downstream);
                }
            }
        }
    }

    fn blank(graph: Arc<DependencyGraph>) -> Self {
        let states = vec![TaskRunState::Pending; graph.len()];
        Self {
            graph,
            states,
            task_runs: Vec::new(),
            phase: RunPhase::NotStarted,
            conditions: Conditions::new(),
        }
    }

    pub fn graph(&self) -> &Arc<DependencyGraph> {
        &self.graph
    }

    pub fn phase(&self) -> &RunPhase {
        &self.phase
    }

    pub fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    pub fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn state_of(&self, task: &str) -> Option<&TaskRunState> {
        let handle = self.graph.handle(task)?;
        Some(&self.states[handle.index()])
    }

    /// Task runs in the order they entered the run, with their state.
    pub fn task_runs(&self) -> impl Iterator<Item = (&str, &TaskRunState)> {
        self.task_runs
            .iter()
            .map(|h| (self.graph.name(*h), &self.states[h.index()]))
    }

    /// Names of tasks that reached terminal success.
    pub fn completed_set(&self) -> HashSet<TaskName> {
        self.names_where(|s| matches!(s, TaskRunState::Succeeded))
    }

    /// Names of tasks that left `Pending`.
    pub fn started_set(&self) -> HashSet<TaskName> {
        self.names_where(|s| !matches!(s, TaskRunState::Pending))
    }

    fn names_where(&self, pred: impl Fn(&TaskRunState) -> bool) -> HashSet<TaskName> {
        self.graph
            .handles()
            .filter(|h| pred(&self.states[h.index()]))
            .map(|h| self.graph.name(h).to_string())
            .collect()
    }

    /// Admit every task whose predecessors all succeeded.
    ///
    /// Admitted tasks move to `Running` and are appended to the task run
    /// list. The first admission sets `Started=True`.
    pub fn admit_ready(&mut self, now: DateTime<Utc>) -> TrackerStep {
        let mut step = TrackerStep::default();
        if self.phase.is_terminal() {
            return step;
        }

        let completed = self.completed_set();
        let started = self.started_set();
        let ready: Vec<TaskHandle> = self
            .graph
            .ready_tasks_excluding(&completed, &started)
            .filter_map(|name| self.graph.handle(name))
            .collect();

        for handle in ready {
            let name = self.graph.name(handle).to_string();
            info!(task = %name, "admitting task run");
            self.states[handle.index()] = TaskRunState::Running;
            self.task_runs.push(handle);
            step.admitted.push(name);
        }

        if !step.admitted.is_empty() && self.phase == RunPhase::NotStarted {
            self.phase = RunPhase::Running;
        }

        step.run_just_completed = self.finish_if_complete();
        self.sync_conditions(now);
        step
    }

    /// Record the terminal outcome of a running task and admit whatever
    /// became ready.
    ///
    /// A failure blocks every transitive successor that has not started;
    /// branches that do not depend on the failed task keep running.
    pub fn record_outcome(
        &mut self,
        task: &str,
        outcome: TaskOutcome,
        now: DateTime<Utc>,
    ) -> Result<TrackerStep> {
        let handle = self
            .graph
            .handle(task)
            .ok_or_else(|| PipelineRunError::TaskNotFound(task.to_string()))?;

        let current = &self.states[handle.index()];
        if *current != TaskRunState::Running {
            let to = match outcome {
                TaskOutcome::Succeeded => "Succeeded",
                TaskOutcome::Failed { .. } => "Failed",
            };
            return Err(PipelineRunError::IllegalTaskTransition {
                task: task.to_string(),
                from: current.label(),
                to,
            });
        }

        let mut blocked = Vec::new();
        match outcome {
            TaskOutcome::Succeeded => {
                debug!(task = %task, "task run succeeded");
                self.states[handle.index()] = TaskRunState::Succeeded;
            }
            TaskOutcome::Failed { message } => {
                warn!(task = %task, error = %message, "task run failed; blocking dependents");
                self.states[handle.index()] = TaskRunState::Failed { message };

                for downstream in self.graph.downstream_of(handle) {
                    if self.states[downstream.index()] == TaskRunState::Pending {
                        let name = self.graph.name(downstream).to_string();
                        debug!(task = %name, by = %task, "task run blocked by failed dependency");
                        self.states[downstream.index()] = TaskRunState::Blocked {
                            by: task.to_string(),
                        };
                        self.task_runs.push(downstream);
                        blocked.push(name);
                    }
                }
            }
        }

        let mut step = self.admit_ready(now);
        step.blocked = blocked;
        Ok(step)
    }

    /// Move to a completed phase once every task is terminal.
    ///
    /// Returns `true` if this call completed the run.
    fn finish_if_complete(&mut self) -> bool {
        if self.phase.is_terminal() || !self.states.iter().all(TaskRunState::is_terminal) {
            return false;
        }

        // Handles are in declaration order, so the first hit is the
        // earliest declared failure.
        let first_failed = self.graph.handles().find_map(|h| match &self.states[h.index()] {
            TaskRunState::Failed { message } => Some((h, message.clone())),
            _ => None,
        });

        self.phase = match first_failed {
            None => {
                info!(tasks = self.graph.len(), "all task runs succeeded; run completed");
                RunPhase::CompletedSuccess
            }
            Some((handle, failure)) => {
                let failed_task = self.graph.name(handle).to_string();
                let others = self
                    .states
                    .iter()
                    .filter(|s| matches!(s, TaskRunState::Failed { .. }))
                    .count()
                    - 1;
                let blocked = self
                    .states
                    .iter()
                    .filter(|s| matches!(s, TaskRunState::Blocked { .. }))
                    .count();
                let message = format!(
                    "task run '{failed_task}' failed: {failure} ({others} other failed, {blocked} blocked)"
                );
                warn!(task = %failed_task, others, blocked, "run completed with failures");
                RunPhase::CompletedFailure {
                    failed_task,
                    message,
                }
            }
        };
        true
    }

    fn enter_invalid(&mut self, error: &PipelineRunError, now: DateTime<Utc>) {
        warn!(%error, "dependency graph rejected; run is terminally failed");
        self.phase = RunPhase::InvalidGraph {
            message: error.to_string(),
        };
        self.sync_conditions(now);
    }

    fn apply_projection(&mut self, now: DateTime<Utc>) -> Result<()> {
        for update in self.phase.project() {
            self.conditions.apply(update, now)?;
        }
        Ok(())
    }

    /// Phases only move forward, so the projection never conflicts with
    /// conditions this tracker wrote itself.
    fn sync_conditions(&mut self, now: DateTime<Utc>) {
        if let Err(err) = self.apply_projection(now) {
            warn!(%err, phase = %self.phase, "condition projection rejected");
        }
    }

    /// Shortcut for the `Succeeded` axis.
    pub fn succeeded(&self) -> ConditionStatus {
        self.conditions.status_of(ConditionType::Succeeded)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::dag::GraphBuilder;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn chain() -> Arc<DependencyGraph> {
        let mut b = GraphBuilder::new();
        b.add_task("A", &[], &[]).unwrap();
        b.add_task("B", &["A"], &[]).unwrap();
        b.add_task("C", &["B"], &[]).unwrap();
        Arc::new(b.build().unwrap())
    }

    #[test]
    fn fresh_tracker_reports_everything_unknown() {
        let tracker = RunTracker::new(chain(), t(0));
        assert_eq!(tracker.phase(), &RunPhase::NotStarted);
        assert_eq!(tracker.conditions().len(), 3);
        assert!(
            tracker
                .conditions()
                .iter()
                .all(|c| c.status == ConditionStatus::Unknown)
        );
    }

    #[test]
    fn first_admission_starts_the_run() {
        let mut tracker = RunTracker::new(chain(), t(0));
        let step = tracker.admit_ready(t(1));
        assert_eq!(step.admitted, vec!["A"]);
        assert_eq!(tracker.phase(), &RunPhase::Running);

        let started = tracker.conditions().get(ConditionType::Started).unwrap();
        assert_eq!(started.status, ConditionStatus::True);
        assert_eq!(started.last_transition_time, t(1));

        // Nothing new is ready while A runs.
        assert!(tracker.admit_ready(t(2)).admitted.is_empty());
        let started = tracker.conditions().get(ConditionType::Started).unwrap();
        assert_eq!(started.last_transition_time, t(1));
    }

    #[test]
    fn chain_failure_blocks_downstream() {
        let mut tracker = RunTracker::new(chain(), t(0));
        tracker.admit_ready(t(1));
        let step = tracker.record_outcome("A", TaskOutcome::Succeeded, t(2)).unwrap();
        assert_eq!(step.admitted, vec!["B"]);

        let step = tracker
            .record_outcome("B", TaskOutcome::failed("exit code 2"), t(3))
            .unwrap();
        assert!(step.admitted.is_empty());
        assert_eq!(step.blocked, vec!["C"]);
        assert!(step.run_just_completed);

        assert_eq!(
            tracker.state_of("C"),
            Some(&TaskRunState::Blocked { by: "B".into() })
        );
        assert_eq!(
            tracker.conditions().status_of(ConditionType::Completed),
            ConditionStatus::True
        );
        let succeeded = tracker.conditions().get(ConditionType::Succeeded).unwrap();
        assert_eq!(succeeded.status, ConditionStatus::False);
        assert_eq!(succeeded.reason.as_deref(), Some("TaskRunFailed(B)"));
        assert!(succeeded.message.as_deref().unwrap().contains("exit code 2"));
    }

    #[test]
    fn outcome_for_task_that_is_not_running_is_rejected() {
        let mut tracker = RunTracker::new(chain(), t(0));
        tracker.admit_ready(t(1));
        let err = tracker
            .record_outcome("C", TaskOutcome::Succeeded, t(2))
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineRunError::IllegalTaskTransition { from: "Pending", .. }
        ));

        let err = tracker
            .record_outcome("nope", TaskOutcome::Succeeded, t(2))
            .unwrap_err();
        assert!(matches!(err, PipelineRunError::TaskNotFound(_)));
    }

    #[test]
    fn cyclic_graph_is_terminal_before_anything_runs() {
        let mut b = GraphBuilder::new();
        b.add_task("A", &["B"], &[]).unwrap();
        b.add_task("B", &["A"], &[]).unwrap();
        let mut tracker = RunTracker::new(Arc::new(b.build().unwrap()), t(0));

        assert!(matches!(tracker.phase(), RunPhase::InvalidGraph { .. }));
        assert!(tracker.admit_ready(t(1)).admitted.is_empty());
        assert_eq!(
            tracker.conditions().status_of(ConditionType::Started),
            ConditionStatus::True
        );
        let succeeded = tracker.conditions().get(ConditionType::Succeeded).unwrap();
        assert_eq!(succeeded.reason.as_deref(), Some(REASON_INVALID_GRAPH));
    }

    #[test]
    fn empty_graph_completes_on_first_pass() {
        let mut tracker = RunTracker::new(Arc::new(DependencyGraph::new()), t(0));
        let step = tracker.admit_ready(t(1));
        assert!(step.run_just_completed);
        assert_eq!(tracker.succeeded(), ConditionStatus::True);
    }
}
