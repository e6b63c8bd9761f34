// src/store.rs

//! In-memory persistence boundary for pipeline runs.
//!
//! Readers get `Arc` snapshots and never hold the lock while they work.
//! Writers replace the whole object and must present the resource version
//! they read; a stale version is rejected with
//! [`PipelineRunError::VersionConflict`] instead of overwriting.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::errors::{PipelineRunError, Result};
use crate::schema::PipelineRun;

#[derive(Debug, Default)]
pub struct RunStore {
    runs: RwLock<HashMap<String, Arc<PipelineRun>>>,
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a new run. Its resource version becomes 1.
    pub fn create(&self, mut run: PipelineRun) -> Result<Arc<PipelineRun>> {
        let mut runs = self.runs.write();
        if runs.contains_key(run.name()) {
            return Err(PipelineRunError::AlreadyExists(run.metadata.name));
        }

        run.metadata.resource_version = 1;
        let run = Arc::new(run);
        runs.insert(run.metadata.name.clone(), Arc::clone(&run));
        debug!(run = %run.metadata.name, "pipeline run created");
        Ok(run)
    }

    /// Snapshot of the current object.
    pub fn get(&self, name: &str) -> Option<Arc<PipelineRun>> {
        self.runs.read().get(name).cloned()
    }

    pub fn list(&self) -> Vec<Arc<PipelineRun>> {
        let mut all: Vec<_> = self.runs.read().values().cloned().collect();
        all.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        all
    }

    /// Replace a run if its `resource_version` still matches the stored one.
    ///
    /// On success the stored copy carries the next resource version.
    pub fn update(&self, mut run: PipelineRun) -> Result<Arc<PipelineRun>> {
        let mut runs = self.runs.write();
        let current = runs
            .get(run.name())
            .ok_or_else(|| PipelineRunError::RunNotFound(run.metadata.name.clone()))?;

        let actual = current.metadata.resource_version;
        if run.metadata.resource_version != actual {
            return Err(PipelineRunError::VersionConflict {
                name: run.metadata.name,
                expected: run.metadata.resource_version,
                actual,
            });
        }

        run.metadata.resource_version = actual + 1;
        let run = Arc::new(run);
        runs.insert(run.metadata.name.clone(), Arc::clone(&run));
        debug!(
            run = %run.metadata.name,
            resource_version = run.metadata.resource_version,
            "pipeline run updated"
        );
        Ok(run)
    }

    /// Read, modify and write back, re-reading on version conflicts.
    ///
    /// `mutate` is re-applied to a fresh snapshot after every conflict. The
    /// last conflict is returned once `attempts` are used up.
    pub fn update_with_retry<F>(&self, name: &str, attempts: usize, mut mutate: F) -> Result<Arc<PipelineRun>>
    where
        F: FnMut(&mut PipelineRun) -> Result<()>,
    {
        let mut last_err = None;

        for attempt in 1..=attempts.max(1) {
            let snapshot = self
                .get(name)
                .ok_or_else(|| PipelineRunError::RunNotFound(name.to_string()))?;
            let mut next = PipelineRun::clone(&snapshot);
            mutate(&mut next)?;

            match self.update(next) {
                Ok(stored) => return Ok(stored),
                Err(err) if err.is_conflict() => {
                    warn!(run = %name, attempt, %err, "update conflicted; re-reading");
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err.unwrap_or_else(|| PipelineRunError::RunNotFound(name.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PipelineRunSpec;

    #[test]
    fn stale_write_is_rejected() {
        let store = RunStore::new();
        let created = store
            .create(PipelineRun::new("r1", PipelineRunSpec::default()))
            .unwrap();
        assert_eq!(created.metadata.resource_version, 1);

        let mut first = PipelineRun::clone(&created);
        let mut second = PipelineRun::clone(&created);
        first.spec.trigger_ref.name = "first".into();
        second.spec.trigger_ref.name = "second".into();

        let stored = store.update(first).unwrap();
        assert_eq!(stored.metadata.resource_version, 2);

        match store.update(second) {
            Err(PipelineRunError::VersionConflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(store.get("r1").unwrap().spec.trigger_ref.name, "first");
    }

    #[test]
    fn snapshots_survive_later_writes() {
        let store = RunStore::new();
        store
            .create(PipelineRun::new("r1", PipelineRunSpec::default()))
            .unwrap();
        let snapshot = store.get("r1").unwrap();

        store
            .update_with_retry("r1", 3, |run| {
                run.spec.trigger_ref.name = "bob".into();
                Ok(())
            })
            .unwrap();

        assert_eq!(snapshot.spec.trigger_ref.name, "");
        assert_eq!(snapshot.metadata.resource_version, 1);
        assert_eq!(store.get("r1").unwrap().metadata.resource_version, 2);
    }

    #[test]
    fn duplicate_create_fails() {
        let store = RunStore::new();
        store
            .create(PipelineRun::new("r1", PipelineRunSpec::default()))
            .unwrap();
        assert!(matches!(
            store.create(PipelineRun::new("r1", PipelineRunSpec::default())),
            Err(PipelineRunError::AlreadyExists(_))
        ));
    }
}
