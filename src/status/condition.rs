// src/status/condition.rs

//! Timestamped conditions keyed by type.

use chrono::{DateTime, SubsecRound, Utc};
use tracing::debug;

use crate::errors::{PipelineRunError, Result};
use crate::types::{ConditionStatus, ConditionType};

/// One observation on one condition axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    pub last_transition_time: DateTime<Utc>,
    pub reason: Option<String>,
    pub message: Option<String>,
}

/// Desired state of one condition, without a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionUpdate {
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    pub reason: Option<String>,
    pub message: Option<String>,
}

impl ConditionUpdate {
    pub fn new(condition_type: ConditionType, status: ConditionStatus) -> Self {
        Self {
            condition_type,
            status,
            reason: None,
            message: None,
        }
    }

    /// Empty strings are stored as absent, matching the persisted form.
    pub fn with_reason(mut self, reason: impl Into<String>, message: impl Into<String>) -> Self {
        self.reason = Some(reason.into()).filter(|r| !r.is_empty());
        self.message = Some(message.into()).filter(|m| !m.is_empty());
        self
    }
}

/// At most one live condition per type, in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    items: Vec<Condition>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a condition set from persisted conditions, keeping their order.
    pub fn from_vec(items: Vec<Condition>) -> Result<Self> {
        for (i, c) in items.iter().enumerate() {
            if items[..i].iter().any(|o| o.condition_type == c.condition_type) {
                return Err(PipelineRunError::InvalidStatus(format!(
                    "condition type {} appears more than once",
                    c.condition_type
                )));
            }
        }
        Ok(Self { items })
    }

    pub fn get(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.items.iter().find(|c| c.condition_type == condition_type)
    }

    /// Status of the given axis; absent conditions read as Unknown.
    pub fn status_of(&self, condition_type: ConditionType) -> ConditionStatus {
        self.get(condition_type)
            .map(|c| c.status)
            .unwrap_or(ConditionStatus::Unknown)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Condition> {
        self.items
    }

    /// Apply an update along one axis.
    ///
    /// Each axis only moves Unknown -> True | False. The transition time
    /// changes only when the status value changes. Re-applying Unknown may
    /// refresh reason and message; a settled condition is frozen, so
    /// re-applying it is only accepted as an exact no-op.
    ///
    /// Returns whether anything changed.
    pub fn apply(&mut self, update: ConditionUpdate, now: DateTime<Utc>) -> Result<bool> {
        let now = now.trunc_subsecs(0);

        let Some(pos) = self
            .items
            .iter()
            .position(|c| c.condition_type == update.condition_type)
        else {
            debug!(condition = %update.condition_type, status = %update.status, "condition set");
            self.items.push(Condition {
                condition_type: update.condition_type,
                status: update.status,
                last_transition_time: now,
                reason: update.reason,
                message: update.message,
            });
            return Ok(true);
        };

        let existing = &mut self.items[pos];
        if existing.status == update.status {
            if existing.status.is_settled()
                && (existing.reason != update.reason || existing.message != update.message)
            {
                return Err(PipelineRunError::SettledConditionRewrite {
                    condition: update.condition_type,
                    status: existing.status,
                });
            }
            let changed = existing.reason != update.reason || existing.message != update.message;
            existing.reason = update.reason;
            existing.message = update.message;
            return Ok(changed);
        }

        if existing.status.is_settled() {
            return Err(PipelineRunError::IllegalConditionTransition {
                condition: update.condition_type,
                current: existing.status,
                requested: update.status,
            });
        }

        debug!(
            condition = %update.condition_type,
            from = %existing.status,
            to = %update.status,
            "condition transitioned"
        );
        existing.status = update.status;
        existing.last_transition_time = now;
        existing.reason = update.reason;
        existing.message = update.message;
        Ok(true)
    }
}
