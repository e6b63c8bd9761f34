// src/engine/core.rs

//! Pure core of the run engine.
//!
//! The core consumes [`RuntimeEvent`]s and produces:
//! - an updated run tracker
//! - a list of commands describing what the IO shell should do next
//!
//! It has no channels, no Tokio types and performs no IO, so it can be
//! stepped by hand in tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::{ParamSet, RawPipelineDefinition};
use crate::engine::{RuntimeEvent, RuntimeOptions, ScheduledTask};
use crate::schema::PipelineRunStatus;
use crate::status::{RunTracker, TrackerStep};

/// Command produced by the core, executed by the IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// Write this status to the run store.
    PersistStatus(PipelineRunStatus),
    /// The run is complete and the runtime may stop.
    RequestExit,
}

/// Decision returned by the core after handling one event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Single owner of one run's state machine.
#[derive(Debug)]
pub struct CoreRuntime {
    run_name: String,
    tracker: RunTracker,
    params: Arc<ParamSet>,
    options: RuntimeOptions,
}

impl CoreRuntime {
    /// Start a run from a pipeline definition.
    ///
    /// Duplicate, dangling and cyclic task declarations do not fail here:
    /// the run is created in its terminal invalid-graph state instead.
    pub fn start(
        run_name: impl Into<String>,
        definition: &RawPipelineDefinition,
        params: ParamSet,
        options: RuntimeOptions,
        now: DateTime<Utc>,
    ) -> (Self, CoreStep) {
        let tracker = match definition.build_graph() {
            Ok(graph) => RunTracker::new(Arc::new(graph), now),
            Err(err) => RunTracker::invalid(&err, now),
        };
        Self::resume(run_name, tracker, params, options, now)
    }

    /// Continue with an existing tracker (e.g. one restored from a snapshot).
    pub fn resume(
        run_name: impl Into<String>,
        tracker: RunTracker,
        params: ParamSet,
        options: RuntimeOptions,
        now: DateTime<Utc>,
    ) -> (Self, CoreStep) {
        let mut core = Self {
            run_name: run_name.into(),
            tracker,
            params: Arc::new(params),
            options,
        };
        info!(run = %core.run_name, phase = %core.tracker.phase(), "run engine started");

        let step = core.tracker.admit_ready(now);
        let out = core.commands_for(step);
        (core, out)
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn options(&self) -> RuntimeOptions {
        self.options
    }

    pub fn tracker(&self) -> &RunTracker {
        &self.tracker
    }

    pub fn status(&self) -> PipelineRunStatus {
        PipelineRunStatus::from(&self.tracker)
    }

    pub fn is_complete(&self) -> bool {
        self.tracker.is_complete()
    }

    /// Handle a single event, returning the commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent, now: DateTime<Utc>) -> CoreStep {
        match event {
            RuntimeEvent::TaskCompleted { task, outcome } => {
                match self.tracker.record_outcome(&task, outcome, now) {
                    Ok(step) => self.commands_for(step),
                    Err(err) => {
                        warn!(run = %self.run_name, task = %task, %err, "ignoring task outcome");
                        CoreStep {
                            commands: Vec::new(),
                            keep_running: true,
                        }
                    }
                }
            }
            RuntimeEvent::ShutdownRequested => {
                info!(run = %self.run_name, "shutdown requested; run left as persisted");
                CoreStep {
                    commands: Vec::new(),
                    keep_running: false,
                }
            }
        }
    }

    fn commands_for(&self, step: TrackerStep) -> CoreStep {
        let mut commands = Vec::new();

        if !step.admitted.is_empty() {
            let tasks = step
                .admitted
                .into_iter()
                .map(|name| ScheduledTask {
                    name,
                    run_name: self.run_name.clone(),
                    params: Arc::clone(&self.params),
                })
                .collect();
            commands.push(CoreCommand::DispatchTasks(tasks));
        }

        commands.push(CoreCommand::PersistStatus(self.status()));

        let mut keep_running = true;
        if self.tracker.is_complete() {
            debug!(run = %self.run_name, phase = %self.tracker.phase(), "run complete");
            commands.push(CoreCommand::RequestExit);
            keep_running = !self.options.exit_when_complete;
        }

        CoreStep {
            commands,
            keep_running,
        }
    }
}
