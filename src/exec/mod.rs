// src/exec/mod.rs

//! Task run execution layer.
//!
//! Running real containers is out of scope; task runs are executed by a
//! simulator that reports scripted outcomes to the runtime.
//!
//! - [`backend`] provides the `ExecutorBackend` trait used by the runtime.
//! - [`simulated`] owns the background loop that completes task runs.

pub mod backend;
pub mod simulated;

pub use backend::{ExecutorBackend, SimulatedExecutor};
pub use simulated::{OutcomeScript, spawn_simulator};
