// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::{ParamsReader, PipelineReader};
use crate::errors::{PipelineRunError, Result};
use crate::exec::ExecutorBackend;
use crate::schema::{PipelineRun, PipelineRunStatus};
use crate::store::RunStore;

use super::core::CoreRuntime;
use super::{CoreCommand, CoreStep, RuntimeEvent, RuntimeOptions, ScheduledTask};

/// Drives a [`CoreRuntime`] from `RuntimeEvent`s, hands admitted tasks to an
/// `ExecutorBackend` and writes every status change to the [`RunStore`].
///
/// All run semantics live in the core; this struct only does async IO.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    store: Arc<RunStore>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        store: Arc<RunStore>,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
            store,
        }
    }

    /// Main event loop.
    ///
    /// `initial` is the step returned when the core was started; its commands
    /// run before the first event is read. Returns the last stored snapshot
    /// of the run.
    pub async fn run(mut self, initial: CoreStep) -> Result<Arc<PipelineRun>> {
        info!(run = %self.core.run_name(), "pipeline run runtime started");

        let mut keep_running = self.execute_step(initial).await?;

        while keep_running {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");
            let step = self.core.step(event, Utc::now());
            keep_running = self.execute_step(step).await?;
        }

        info!(
            run = %self.core.run_name(),
            complete = self.core.is_complete(),
            "runtime exiting"
        );
        self.persist(self.core.status())
    }

    async fn execute_step(&mut self, step: CoreStep) -> Result<bool> {
        for command in step.commands {
            self.execute_command(command).await?;
        }
        if !step.keep_running {
            info!("core requested exit; stopping runtime");
        }
        Ok(step.keep_running)
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => self.dispatch(tasks).await,
            CoreCommand::PersistStatus(status) => self.persist(status).map(|_| ()),
            CoreCommand::RequestExit => {
                info!(run = %self.core.run_name(), phase = %self.core.tracker().phase(), "run finished");
                Ok(())
            }
        }
    }

    async fn dispatch(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, "dispatching admitted tasks");
        self.executor.spawn_ready_tasks(tasks).await
    }

    /// Only the status subresource is replaced, so concurrent spec writers
    /// are retried against rather than overwritten.
    fn persist(&self, status: PipelineRunStatus) -> Result<Arc<PipelineRun>> {
        let attempts = self.core.options().update_attempts;
        self.store
            .update_with_retry(self.core.run_name(), attempts, |run| {
                run.status = status.clone();
                Ok(())
            })
    }
}

/// Resolve a stored run's references, start its engine and drive it to the
/// end.
///
/// The pipeline and parameter set are read through `reader`. A definition
/// whose tasks do not form a valid graph still yields a stored run, in its
/// terminal failed state; only unreadable references are returned as errors.
pub async fn execute_run<R, E, F>(
    store: Arc<RunStore>,
    reader: &R,
    run_name: &str,
    options: RuntimeOptions,
    make_executor: F,
) -> Result<Arc<PipelineRun>>
where
    R: PipelineReader + ParamsReader,
    E: ExecutorBackend,
    F: FnOnce(mpsc::Sender<RuntimeEvent>) -> E,
{
    let run = store
        .get(run_name)
        .ok_or_else(|| PipelineRunError::RunNotFound(run_name.to_string()))?;

    let definition = reader.read_pipeline(&run.spec.pipeline_ref)?;
    let params = reader.read_params(&run.spec.pipeline_params_ref)?;

    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = make_executor(tx);

    let (core, initial) = CoreRuntime::start(run_name, &definition, params, options, Utc::now());
    Runtime::new(core, rx, executor, store).run(initial).await
}
