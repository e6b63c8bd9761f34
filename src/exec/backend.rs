// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of a raw mpsc sender, so
//! tests can swap in a fake that records dispatched tasks and reports
//! outcomes directly, while the CLI uses [`SimulatedExecutor`].

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::engine::{RuntimeEvent, ScheduledTask};
use crate::errors::{Error, Result};

use super::simulated::{OutcomeScript, spawn_simulator};

/// Trait abstracting how admitted task runs are executed.
///
/// Implementations report each terminal outcome back to the runtime as a
/// `RuntimeEvent::TaskCompleted`.
pub trait ExecutorBackend: Send {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Backend that forwards task runs to the background simulator loop.
pub struct SimulatedExecutor {
    tx: mpsc::Sender<ScheduledTask>,
}

impl SimulatedExecutor {
    /// Spawns the simulator loop immediately.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, script: OutcomeScript) -> Self {
        let tx = spawn_simulator(runtime_tx, script);
        Self { tx }
    }
}

impl ExecutorBackend for SimulatedExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            for task in tasks {
                tx.send(task).await.map_err(Error::from)?;
            }
            Ok(())
        })
    }
}
