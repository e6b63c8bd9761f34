// src/schema/mod.rs

//! Persisted representation of pipeline runs.
//!
//! This layer only describes the stored shape (serde DTOs) and converts to
//! and from the graph and state machine types, which know nothing about
//! serialization.

pub mod convert;
pub mod pipeline_run;
pub mod print;

pub use convert::{graph_from_refs, refs_from_graph};
pub use pipeline_run::{
    API_VERSION, ObjectMeta, ObjectReference, PipelineParamsRef, PipelineRef, PipelineRun,
    PipelineRunCondition, PipelineRunList, PipelineRunSpec, PipelineRunStatus,
    PipelineTaskRun, PipelineTaskRunRef, PipelineTriggerRef, TaskRunOutcome, TaskRunRef,
};
