// src/status/mod.rs

//! Run status state machine.
//!
//! The lifecycle is an explicit [`RunPhase`]; the three condition axes
//! (Started, Completed, Succeeded) are a projection of it, applied to a
//! timestamped [`Conditions`] set that only moves Unknown -> True | False.
//!
//! - [`condition`] holds the condition set and its transition rules.
//! - [`phase`] defines the run phase, per-task state and the projection.
//! - [`tracker`] drives both from task outcomes over a dependency graph.

pub mod condition;
pub mod phase;
pub mod tracker;

pub use condition::{Condition, ConditionUpdate, Conditions};
pub use phase::{REASON_INVALID_GRAPH, REASON_TASK_RUN_FAILED, RunPhase, TaskRunState};
pub use tracker::{RunTracker, TrackerStep};
