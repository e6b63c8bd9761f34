// src/schema/pipeline_run.rs

//! Persisted shape of a pipeline run.
//!
//! Optional strings are omitted when empty rather than written as `null` or
//! `""`, so unchanged objects produce minimal diffs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ConditionStatus, ConditionType, TriggerType};

/// Group/version written on objects created by this crate.
pub const API_VERSION: &str = "pipeline.knative.dev/v1beta1";

pub const KIND_PIPELINE_RUN: &str = "PipelineRun";
pub const KIND_PIPELINE_RUN_LIST: &str = "PipelineRunList";

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND_PIPELINE_RUN.to_string()
}

fn default_list_kind() -> String {
    KIND_PIPELINE_RUN_LIST.to_string()
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

/// Weak reference to another object by name and optional API version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
}

impl ObjectReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_version: String::new(),
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// The referent's API version, falling back to the referring object's
    /// own group/version.
    pub fn effective_api_version<'a>(&'a self, referrer: &'a str) -> &'a str {
        if self.api_version.is_empty() {
            referrer
        } else {
            &self.api_version
        }
    }
}

pub type PipelineRef = ObjectReference;
pub type PipelineParamsRef = ObjectReference;
pub type TaskRunRef = ObjectReference;

/// What caused the run to be created.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PipelineTriggerRef {
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunSpec {
    pub pipeline_ref: PipelineRef,
    pub pipeline_params_ref: PipelineParamsRef,
    pub trigger_ref: PipelineTriggerRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    /// Optimistic-concurrency token; 0 means "never persisted".
    #[serde(default, skip_serializing_if = "is_zero")]
    pub resource_version: u64,
}

/// Terminal outcome recorded on a task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskRunOutcome {
    Succeeded,
    Failed,
    /// Never ran because a predecessor failed.
    Blocked,
}

/// One task run of the pipeline run. No outcome means it is still running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTaskRun {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<TaskRunOutcome>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub blocked_by: String,
}

impl PipelineTaskRun {
    pub fn running(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: None,
            message: String::new(),
            blocked_by: String::new(),
        }
    }
}

/// Graph node wrapper: a task run plus its successors and predecessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTaskRunRef {
    #[serde(flatten)]
    pub task_run: TaskRunRef,
    #[serde(default)]
    pub next_tasks: Vec<TaskRunRef>,
    #[serde(default)]
    pub prev_tasks: Vec<TaskRunRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunCondition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    pub last_transition_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub task_runs: Vec<PipelineTaskRun>,
    #[serde(default)]
    pub conditions: Vec<PipelineRunCondition>,
}

impl PipelineRunStatus {
    pub fn condition(&self, condition_type: ConditionType) -> Option<&PipelineRunCondition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: PipelineRunSpec,
    #[serde(default)]
    pub status: PipelineRunStatus,
}

impl PipelineRun {
    pub fn new(name: impl Into<String>, spec: PipelineRunSpec) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ObjectMeta {
                name: name.into(),
                resource_version: 0,
            },
            spec,
            status: PipelineRunStatus::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// A fresh run of the same pipeline under a new name.
    ///
    /// The spec of an existing run is never edited to run it again.
    pub fn retrigger(&self, name: impl Into<String>, trigger: PipelineTriggerRef) -> Self {
        let mut spec = self.spec.clone();
        spec.trigger_ref = trigger;
        Self::new(name, spec)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunList {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_list_kind")]
    pub kind: String,
    #[serde(default)]
    pub items: Vec<PipelineRun>,
}

impl PipelineRunList {
    pub fn new(items: Vec<PipelineRun>) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_list_kind(),
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_optionals_are_omitted() {
        let run = PipelineRun::new(
            "build-1",
            PipelineRunSpec {
                pipeline_ref: ObjectReference::new("build"),
                pipeline_params_ref: ObjectReference::new("defaults"),
                trigger_ref: PipelineTriggerRef::default(),
            },
        );
        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(
            value,
            json!({
                "apiVersion": API_VERSION,
                "kind": "PipelineRun",
                "metadata": { "name": "build-1" },
                "spec": {
                    "pipelineRef": { "name": "build" },
                    "pipelineParamsRef": { "name": "defaults" },
                    "triggerRef": { "type": "manual" }
                },
                "status": { "conditions": [] }
            })
        );
    }

    #[test]
    fn succeeded_axis_uses_successful_wire_name() {
        let raw = json!({
            "type": "Successful",
            "status": "False",
            "lastTransitionTime": "2026-01-01T00:00:00Z",
            "reason": "TaskRunFailed(B)"
        });
        let cond: PipelineRunCondition = serde_json::from_value(raw).unwrap();
        assert_eq!(cond.condition_type, ConditionType::Succeeded);
        assert!(cond.message.is_empty());

        let legacy: ConditionType = serde_json::from_value(json!("Succeeded")).unwrap();
        assert_eq!(legacy, ConditionType::Succeeded);
    }

    #[test]
    fn task_run_ref_flattens_its_own_reference() {
        let node = PipelineTaskRunRef {
            task_run: ObjectReference::new("test"),
            next_tasks: vec![ObjectReference::new("deploy")],
            prev_tasks: vec![ObjectReference::new("build").with_api_version("v1")],
        };
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "test",
                "nextTasks": [{ "name": "deploy" }],
                "prevTasks": [{ "name": "build", "apiVersion": "v1" }]
            })
        );
    }

    #[test]
    fn missing_api_version_defaults_to_referrer() {
        let r = ObjectReference::new("build");
        assert_eq!(r.effective_api_version(API_VERSION), API_VERSION);
        let r = r.with_api_version("tekton.dev/v1");
        assert_eq!(r.effective_api_version(API_VERSION), "tekton.dev/v1");
    }

    #[test]
    fn retrigger_leaves_original_untouched() {
        let mut original = PipelineRun::new("build-1", PipelineRunSpec::default());
        original.metadata.resource_version = 4;
        let again = original.retrigger(
            "build-2",
            PipelineTriggerRef {
                trigger_type: TriggerType::Manual,
                name: "alice".into(),
            },
        );
        assert_eq!(original.spec.trigger_ref.name, "");
        assert_eq!(again.spec.trigger_ref.name, "alice");
        assert_eq!(again.metadata.resource_version, 0);
        assert!(again.status.conditions.is_empty());
    }
}
