// src/engine/mod.rs

//! Drives one pipeline run from executor outcomes.
//!
//! This module ties together:
//! - the run status state machine (admission, outcomes, completion)
//! - the executor backend that runs admitted tasks
//! - the run store, which receives every status change
//!
//! The pure core lives in [`core`]; the async/IO shell is implemented in
//! [`runtime`].

use std::sync::Arc;

use crate::config::ParamSet;
use crate::types::{TaskName, TaskOutcome};

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Stop the runtime as soon as the run completes.
    pub exit_when_complete: bool,
    /// How many times a status write is retried after version conflicts.
    pub update_attempts: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            exit_when_complete: true,
            update_attempts: 5,
        }
    }
}

/// Events flowing into the runtime from executors and signal handlers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A task run reached a terminal outcome.
    TaskCompleted { task: TaskName, outcome: TaskOutcome },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// A task run the executor should start now.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub name: TaskName,
    /// Name of the pipeline run this task run belongs to.
    pub run_name: String,
    pub params: Arc<ParamSet>,
}

pub mod core;
pub mod runtime;

pub use self::core::{CoreCommand, CoreRuntime, CoreStep};
pub use runtime::{Runtime, execute_run};
