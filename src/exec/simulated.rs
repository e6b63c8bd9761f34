// src/exec/simulated.rs

//! Background loop that "runs" task runs by reporting scripted outcomes.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, ScheduledTask};
use crate::types::{TaskName, TaskOutcome};

/// Which task runs fail, and how long each task run takes.
#[derive(Debug, Clone, Default)]
pub struct OutcomeScript {
    failures: HashMap<TaskName, String>,
    delay: Duration,
}

impl OutcomeScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(mut self, task: impl Into<TaskName>, message: impl Into<String>) -> Self {
        self.failures.insert(task.into(), message.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn outcome_for(&self, task: &str) -> TaskOutcome {
        match self.failures.get(task) {
            Some(message) => TaskOutcome::failed(message.clone()),
            None => TaskOutcome::Succeeded,
        }
    }
}

/// Spawn the simulator loop and return the sender tasks are dispatched on.
///
/// Each task run completes in its own Tokio task after the scripted delay.
pub fn spawn_simulator(
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    script: OutcomeScript,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        info!("simulated executor started");

        while let Some(task) = rx.recv().await {
            let outcome = script.outcome_for(&task.name);
            let delay = script.delay;
            let runtime_tx = runtime_tx.clone();

            tokio::spawn(async move {
                debug!(run = %task.run_name, task = %task.name, "task run started");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                debug!(task = %task.name, success = outcome.is_success(), "task run finished");

                let event = RuntimeEvent::TaskCompleted {
                    task: task.name,
                    outcome,
                };
                if runtime_tx.send(event).await.is_err() {
                    warn!("runtime gone; dropping task outcome");
                }
            });
        }

        info!("simulated executor finished (channel closed)");
    });

    tx
}
