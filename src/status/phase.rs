// src/status/phase.rs

//! Explicit run lifecycle and its projection onto the three condition axes.

use std::fmt;

use crate::status::condition::ConditionUpdate;
use crate::types::{ConditionStatus, ConditionType, TaskName};

/// Reason set on `Succeeded=False` when the graph failed validation.
pub const REASON_INVALID_GRAPH: &str = "InvalidDependencyGraph";

/// Prefix of the reason set on `Succeeded=False` when a task run failed.
pub const REASON_TASK_RUN_FAILED: &str = "TaskRunFailed";

/// Lifecycle of a pipeline run.
///
/// The condition view is derived from this value, so combinations like
/// `Succeeded=True` with `Completed=Unknown` cannot be expressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    /// No task run has been admitted yet.
    NotStarted,
    /// At least one task run was admitted and not every task is terminal.
    Running,
    /// Every task run succeeded.
    CompletedSuccess,
    /// Every task is terminal and at least one task run failed.
    CompletedFailure { failed_task: TaskName, message: String },
    /// The dependency graph was rejected before anything ran.
    InvalidGraph { message: String },
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::CompletedSuccess | Self::CompletedFailure { .. } | Self::InvalidGraph { .. }
        )
    }

    pub fn is_started(&self) -> bool {
        !matches!(self, Self::NotStarted)
    }

    /// Desired state of every condition axis for this phase.
    pub fn project(&self) -> [ConditionUpdate; 3] {
        use ConditionStatus::{False, True, Unknown};
        use ConditionType::{Completed, Started, Succeeded};

        match self {
            Self::NotStarted => [
                ConditionUpdate::new(Started, Unknown),
                ConditionUpdate::new(Completed, Unknown),
                ConditionUpdate::new(Succeeded, Unknown),
            ],
            Self::Running => [
                ConditionUpdate::new(Started, True),
                ConditionUpdate::new(Completed, Unknown),
                ConditionUpdate::new(Succeeded, Unknown),
            ],
            Self::CompletedSuccess => [
                ConditionUpdate::new(Started, True),
                ConditionUpdate::new(Completed, True),
                ConditionUpdate::new(Succeeded, True),
            ],
            Self::CompletedFailure {
                failed_task,
                message,
            } => [
                ConditionUpdate::new(Started, True),
                ConditionUpdate::new(Completed, True),
                ConditionUpdate::new(Succeeded, False)
                    .with_reason(task_failed_reason(failed_task), message.clone()),
            ],
            Self::InvalidGraph { message } => [
                ConditionUpdate::new(Started, True),
                ConditionUpdate::new(Completed, True),
                ConditionUpdate::new(Succeeded, False)
                    .with_reason(REASON_INVALID_GRAPH, message.clone()),
            ],
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::Running => write!(f, "running"),
            Self::CompletedSuccess => write!(f, "succeeded"),
            Self::CompletedFailure { failed_task, .. } => {
                write!(f, "failed (task run '{failed_task}')")
            }
            Self::InvalidGraph { .. } => write!(f, "invalid dependency graph"),
        }
    }
}

/// Reason naming the first failed task, e.g. `TaskRunFailed(build)`.
pub fn task_failed_reason(task: &str) -> String {
    format!("{REASON_TASK_RUN_FAILED}({task})")
}

/// Per-task state inside a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskRunState {
    /// Not admitted yet.
    Pending,
    /// Admitted and handed to the executor.
    Running,
    Succeeded,
    /// Ran and failed.
    Failed { message: String },
    /// Never ran because the named predecessor failed.
    Blocked { by: TaskName },
}

impl TaskRunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed { .. } | Self::Blocked { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed { .. } => "Failed",
            Self::Blocked { .. } => "Blocked",
        }
    }
}
