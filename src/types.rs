// src/types.rs

//! Small shared vocabulary types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// The three condition axes a pipeline run reports.
///
/// The set is closed: status renderers rely on seeing exactly these types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConditionType {
    /// Whether the run has started executing.
    Started,
    /// Whether the run has finished executing.
    Completed,
    /// Whether the run was successful. Persisted as `Successful`.
    #[serde(rename = "Successful", alias = "Succeeded")]
    Succeeded,
}

impl ConditionType {
    pub const ALL: [ConditionType; 3] = [Self::Started, Self::Completed, Self::Succeeded];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "Started",
            Self::Completed => "Completed",
            Self::Succeeded => "Successful",
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl ConditionStatus {
    /// True and False are final; only Unknown may still move.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::True => "True",
            Self::False => "False",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Mechanism by which a pipeline run was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum TriggerType {
    /// Invoked manually by a user.
    #[default]
    Manual,
}

impl FromStr for TriggerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(TriggerType::Manual),
            other => Err(format!(
                "invalid trigger type: {other} (expected \"manual\")"
            )),
        }
    }
}

/// Terminal outcome an executor reports for a task run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    Failed { message: String },
}

impl TaskOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}
