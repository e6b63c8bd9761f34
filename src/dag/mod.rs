// src/dag/mod.rs

//! Dependency graph over the task runs of a pipeline run.
//!
//! - [`graph`] holds the index-addressed graph, cycle detection, topological
//!   ordering and readiness queries.
//! - [`builder`] declares tasks in one pass, allowing forward references.
//!
//! Nothing here knows about the persisted representation; see
//! [`crate::schema`] for the conversions.

pub mod builder;
pub mod graph;

pub use builder::GraphBuilder;
pub use graph::{DependencyGraph, Edge, TaskHandle};
