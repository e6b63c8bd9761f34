// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::types::{ConditionStatus, ConditionType, TaskName};

#[derive(Error, Debug)]
pub enum PipelineRunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("duplicate task '{0}' in pipeline run")]
    DuplicateTask(TaskName),

    #[error("task '{task}' references undeclared task '{reference}'")]
    DanglingReference { task: TaskName, reference: TaskName },

    #[error("edge {from} -> {to} is not listed on both sides (nextTasks/prevTasks)")]
    AsymmetricEdge { from: TaskName, to: TaskName },

    #[error("cycle detected in task graph: {}", .cycle.join(" -> "))]
    CycleDetected { cycle: Vec<TaskName> },

    #[error("Task not found: {0}")]
    TaskNotFound(TaskName),

    #[error("task '{task}' cannot move from {from} to {to}")]
    IllegalTaskTransition {
        task: TaskName,
        from: &'static str,
        to: &'static str,
    },

    #[error("condition {condition} is settled at {current} and cannot become {requested}")]
    IllegalConditionTransition {
        condition: ConditionType,
        current: ConditionStatus,
        requested: ConditionStatus,
    },

    #[error("condition {condition} is settled at {status}; its reason and message cannot change")]
    SettledConditionRewrite {
        condition: ConditionType,
        status: ConditionStatus,
    },

    #[error("invalid persisted status: {0}")]
    InvalidStatus(String),

    #[error("pipeline run '{0}' already exists")]
    AlreadyExists(String),

    #[error("pipeline run '{0}' not found")]
    RunNotFound(String),

    #[error("version conflict on pipeline run '{name}': expected {expected}, found {actual}")]
    VersionConflict {
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineRunError {
    /// Structural errors make a pipeline run permanently invalid.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::DuplicateTask(_)
                | Self::DanglingReference { .. }
                | Self::AsymmetricEdge { .. }
                | Self::CycleDetected { .. }
        )
    }

    /// Conflicts are recovered by re-reading and retrying the update.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineRunError>;
