//! Per-stage bookkeeping stored on the rendering context.

use crate::cancellation::StageCleanup;
use crate::core::Stage;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Default)]
struct MetadataInner {
    stages_completed: HashMap<Stage, bool>,
    stage_locks: HashMap<Stage, bool>,
    stage_cleanups: HashMap<Stage, Vec<StageCleanup>>,
    failed_stage: Option<Stage>,
    extras: HashMap<String, serde_json::Value>,
}

/// Lock flags, cleanup registries, completion flags and the failed stage.
///
/// Stage locks are advisory: nothing in the pipeline checks them, they exist
/// so plugins can keep themselves from re-entering a stage.
#[derive(Default)]
pub struct StageMetadata {
    inner: Mutex<MetadataInner>,
}

impl StageMetadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `stage` is currently locked.
    #[must_use]
    pub fn is_stage_locked(&self, stage: Stage) -> bool {
        self.inner
            .lock()
            .stage_locks
            .get(&stage)
            .copied()
            .unwrap_or(false)
    }

    /// Locks `stage`.
    pub fn lock_stage(&self, stage: Stage) {
        self.inner.lock().stage_locks.insert(stage, true);
    }

    /// Unlocks `stage`.
    pub fn unlock_stage(&self, stage: Stage) {
        self.inner.lock().stage_locks.insert(stage, false);
    }

    /// Locks `stage` unless it is already locked.
    ///
    /// The returned guard unlocks the stage when dropped.
    #[must_use]
    pub fn try_lock_stage(&self, stage: Stage) -> Option<StageLockGuard<'_>> {
        let mut inner = self.inner.lock();
        let locked = inner.stage_locks.entry(stage).or_insert(false);
        if *locked {
            return None;
        }
        *locked = true;
        Some(StageLockGuard {
            metadata: self,
            stage,
        })
    }

    /// Registers a cleanup to run when `stage` is re-entered or torn down.
    pub fn add_stage_cleanup(&self, stage: Stage, cleanup: StageCleanup) {
        self.inner
            .lock()
            .stage_cleanups
            .entry(stage)
            .or_default()
            .push(cleanup);
    }

    /// Removes and returns the cleanups of `stage` in registration order.
    pub fn take_stage_cleanups(&self, stage: Stage) -> Vec<StageCleanup> {
        self.inner
            .lock()
            .stage_cleanups
            .remove(&stage)
            .unwrap_or_default()
    }

    /// Drops the cleanups of `stage` without running them.
    pub fn clear_stage_cleanups(&self, stage: Stage) -> usize {
        self.take_stage_cleanups(stage).len()
    }

    /// Returns how many cleanups are registered for `stage`.
    #[must_use]
    pub fn pending_cleanups(&self, stage: Stage) -> usize {
        self.inner
            .lock()
            .stage_cleanups
            .get(&stage)
            .map_or(0, Vec::len)
    }

    /// Sets the completion flag of `stage`.
    pub fn mark_stage_completed(&self, stage: Stage, completed: bool) {
        self.inner.lock().stages_completed.insert(stage, completed);
    }

    /// Returns whether `stage` completed during the latest pass.
    #[must_use]
    pub fn is_stage_completed(&self, stage: Stage) -> bool {
        self.inner
            .lock()
            .stages_completed
            .get(&stage)
            .copied()
            .unwrap_or(false)
    }

    /// Returns the stage whose hook failed most recently.
    #[must_use]
    pub fn failed_stage(&self) -> Option<Stage> {
        self.inner.lock().failed_stage
    }

    /// Records (or clears) the failed stage.
    pub fn set_failed_stage(&self, stage: Option<Stage>) {
        self.inner.lock().failed_stage = stage;
    }

    /// Reads a plugin bookkeeping value.
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.lock().extras.get(key).cloned()
    }

    /// Writes a plugin bookkeeping value, returning the previous one.
    pub fn set_extra(
        &self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Option<serde_json::Value> {
        self.inner.lock().extras.insert(key.into(), value)
    }

    /// Returns a serializable view of the metadata.
    #[must_use]
    pub fn snapshot(&self) -> MetadataSnapshot {
        let inner = self.inner.lock();
        MetadataSnapshot {
            stages_completed: inner
                .stages_completed
                .iter()
                .map(|(stage, done)| (*stage, *done))
                .collect(),
            stage_locks: inner
                .stage_locks
                .iter()
                .map(|(stage, locked)| (*stage, *locked))
                .collect(),
            pending_cleanups: inner
                .stage_cleanups
                .iter()
                .filter(|(_, cleanups)| !cleanups.is_empty())
                .map(|(stage, cleanups)| (*stage, cleanups.len()))
                .collect(),
            failed_stage: inner.failed_stage,
            extras: inner
                .extras
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

impl std::fmt::Debug for StageMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StageMetadata").field(&self.snapshot()).finish()
    }
}

/// Unlocks a stage when dropped.
#[derive(Debug)]
pub struct StageLockGuard<'a> {
    metadata: &'a StageMetadata,
    stage: Stage,
}

impl StageLockGuard<'_> {
    /// Returns the locked stage.
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }
}

impl Drop for StageLockGuard<'_> {
    fn drop(&mut self) {
        self.metadata.unlock_stage(self.stage);
    }
}

/// Point-in-time copy of [`StageMetadata`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataSnapshot {
    /// Completion flags by stage.
    pub stages_completed: BTreeMap<Stage, bool>,
    /// Lock flags by stage.
    pub stage_locks: BTreeMap<Stage, bool>,
    /// Number of registered cleanups by stage.
    pub pending_cleanups: BTreeMap<Stage, usize>,
    /// The most recent failed stage.
    pub failed_stage: Option<Stage>,
    /// Plugin bookkeeping values.
    pub extras: BTreeMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_try_lock_stage_guard() {
        let metadata = StageMetadata::new();
        assert!(!metadata.is_stage_locked(Stage::ResourceLoad));

        {
            let guard = metadata.try_lock_stage(Stage::ResourceLoad).unwrap();
            assert_eq!(guard.stage(), Stage::ResourceLoad);
            assert!(metadata.is_stage_locked(Stage::ResourceLoad));
            assert!(metadata.try_lock_stage(Stage::ResourceLoad).is_none());
        }

        assert!(!metadata.is_stage_locked(Stage::ResourceLoad));
        assert!(metadata.try_lock_stage(Stage::ResourceLoad).is_some());
    }

    #[test]
    fn test_manual_lock_and_unlock() {
        let metadata = StageMetadata::new();
        metadata.lock_stage(Stage::BuildScene);
        assert!(metadata.is_stage_locked(Stage::BuildScene));
        assert!(!metadata.is_stage_locked(Stage::InitEngine));
        metadata.unlock_stage(Stage::BuildScene);
        assert!(!metadata.is_stage_locked(Stage::BuildScene));
    }

    #[test]
    fn test_cleanups_are_taken_once() {
        let metadata = StageMetadata::new();
        metadata.add_stage_cleanup(Stage::ResourceLoad, StageCleanup::from_fn(|_| Ok(())).named("a"));
        metadata.add_stage_cleanup(Stage::ResourceLoad, StageCleanup::from_fn(|_| Ok(())).named("b"));
        metadata.add_stage_cleanup(Stage::BuildScene, StageCleanup::from_fn(|_| Ok(())));

        assert_eq!(metadata.pending_cleanups(Stage::ResourceLoad), 2);

        let taken = metadata.take_stage_cleanups(Stage::ResourceLoad);
        let names: Vec<_> = taken.iter().map(|c| c.name().unwrap()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(metadata.pending_cleanups(Stage::ResourceLoad), 0);
        assert!(metadata.take_stage_cleanups(Stage::ResourceLoad).is_empty());

        assert_eq!(metadata.clear_stage_cleanups(Stage::BuildScene), 1);
        assert_eq!(metadata.pending_cleanups(Stage::BuildScene), 0);
    }

    #[test]
    fn test_snapshot() {
        let metadata = StageMetadata::new();
        metadata.mark_stage_completed(Stage::InitEngine, true);
        metadata.mark_stage_completed(Stage::ResourceLoad, false);
        metadata.set_failed_stage(Some(Stage::ResourceParse));
        metadata.add_stage_cleanup(Stage::InitEngine, StageCleanup::from_fn(|_| Ok(())));
        assert_eq!(metadata.set_extra("camera.fitted", json!(true)), None);
        assert_eq!(
            metadata.set_extra("camera.fitted", json!(false)),
            Some(json!(true))
        );

        let snapshot = metadata.snapshot();
        assert_eq!(
            snapshot,
            MetadataSnapshot {
                stages_completed: BTreeMap::from([
                    (Stage::InitEngine, true),
                    (Stage::ResourceLoad, false),
                ]),
                stage_locks: BTreeMap::new(),
                pending_cleanups: BTreeMap::from([(Stage::InitEngine, 1)]),
                failed_stage: Some(Stage::ResourceParse),
                extras: BTreeMap::from([("camera.fitted".to_string(), json!(false))]),
            }
        );

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["stagesCompleted"]["initEngine"], json!(true));
        assert_eq!(value["failedStage"], json!("resourceParse"));
    }
}
