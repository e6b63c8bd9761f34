// src/schema/print.rs

//! Human-readable rendering of a run's status.

use std::fmt::Write;

use crate::schema::pipeline_run::{PipelineRun, PipelineRunStatus, TaskRunOutcome};

/// Render `status.conditions` as an aligned table.
pub fn render_conditions(status: &PipelineRunStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10} {:<8} {:<21} {:<28} MESSAGE",
        "TYPE", "STATUS", "LAST TRANSITION", "REASON"
    );
    for c in &status.conditions {
        let _ = writeln!(
            out,
            "{:<10} {:<8} {:<21} {:<28} {}",
            c.condition_type.as_str(),
            c.status.to_string(),
            c.last_transition_time.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            c.reason,
            c.message
        );
    }
    out
}

/// Render `status.taskRuns`, one line per task run.
pub fn render_task_runs(status: &PipelineRunStatus) -> String {
    let mut out = String::new();
    for run in &status.task_runs {
        let outcome = match run.outcome {
            None => "Running".to_string(),
            Some(TaskRunOutcome::Succeeded) => "Succeeded".to_string(),
            Some(TaskRunOutcome::Failed) => format!("Failed: {}", run.message),
            Some(TaskRunOutcome::Blocked) => format!("Blocked by {}", run.blocked_by),
        };
        let _ = writeln!(out, "  {:<24} {}", run.name, outcome);
    }
    out
}

/// Full summary of a run for terminal output.
pub fn render_run(run: &PipelineRun) -> String {
    let mut out = format!(
        "pipelinerun {} (pipeline {}, resourceVersion {})\n",
        run.metadata.name, run.spec.pipeline_ref.name, run.metadata.resource_version
    );
    out.push_str("task runs:\n");
    out.push_str(&render_task_runs(&run.status));
    out.push_str("conditions:\n");
    out.push_str(&render_conditions(&run.status));
    out
}
