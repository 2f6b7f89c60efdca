//! Log service: progress journal entries and the log-and-apply flow.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::model::{new_log_id, LogDraft, LogEntry, Objective, ObjectivePatch};

use super::{validate, CoreError, CoreResult, Tracker};

/// What happened to the progress half of [`LogService::log_and_apply_progress`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProgressUpdate {
    /// No linked key result, or a zero delta.
    NotRequested,
    /// The key result was advanced and the objective persisted.
    Applied { objective: Objective },
    /// No objective in the snapshot owns the linked key result.
    KeyResultNotFound { kr_id: String },
    /// The owning objective disappeared before the write.
    ObjectiveMissing { objective_id: String },
    /// The objective write failed. The log entry is kept.
    Failed { error: String },
}

/// Result of logging progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogOutcome {
    pub entry: LogEntry,
    pub progress: ProgressUpdate,
}

/// Service for log operations.
pub struct LogService<'a> {
    tracker: &'a Tracker,
}

impl<'a> LogService<'a> {
    pub(crate) const fn new(tracker: &'a Tracker) -> Self {
        Self { tracker }
    }

    /// All log entries, newest first.
    pub fn list(&self) -> CoreResult<Vec<LogEntry>> {
        let mut logs = self.tracker.local().logs().map_err(CoreError::Internal)?;
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(logs)
    }

    /// Record a log entry and, if it is linked with a non-zero delta, add the
    /// delta to the key result's `current`.
    ///
    /// `snapshot` is the caller's view of the objectives, used to find the
    /// key result's owner. The delta is applied to the snapshot's copy of the
    /// key results (no clamping) and the objective's status is re-derived.
    ///
    /// Both writes are attempted. The entry is never rolled back if the
    /// progress write fails; that outcome is reported in
    /// [`LogOutcome::progress`]. An error is returned only when the entry
    /// itself could not be stored.
    pub fn log_and_apply_progress(
        &self,
        draft: LogDraft,
        snapshot: &[Objective],
    ) -> CoreResult<LogOutcome> {
        validate::log_draft(&draft)?;

        let entry = LogEntry {
            id: new_log_id().map_err(CoreError::Internal)?,
            content: draft.content.trim().to_string(),
            date: draft.date.trim().to_string(),
            linked_kr_id: draft.linked_kr_id.filter(|id| !id.trim().is_empty()),
            progress_delta: draft.progress_delta,
            created_at: Utc::now(),
        };

        let _gate = self.tracker.write_gate();
        let stored = self.append(&entry);
        let progress = self.apply_progress(&entry, snapshot);

        stored?;
        info!(id = %entry.id, linked = ?entry.linked_kr_id, "Logged progress");
        Ok(LogOutcome { entry, progress })
    }

    fn append(&self, entry: &LogEntry) -> CoreResult<()> {
        let mut logs = self.tracker.local().logs().map_err(CoreError::Internal)?;
        logs.insert(0, entry.clone());
        self.tracker
            .local()
            .replace_all(&logs)
            .map_err(CoreError::Internal)?;
        self.tracker.mirror_put(entry);
        Ok(())
    }

    fn apply_progress(&self, entry: &LogEntry, snapshot: &[Objective]) -> ProgressUpdate {
        let Some(kr_id) = entry.linked_kr_id.as_deref() else {
            return ProgressUpdate::NotRequested;
        };
        if entry.progress_delta == 0.0 {
            return ProgressUpdate::NotRequested;
        }

        let Some(owner) = snapshot.iter().find(|o| o.has_key_result(kr_id)) else {
            debug!(kr_id, "Linked key result not found, progress not applied");
            return ProgressUpdate::KeyResultNotFound {
                kr_id: kr_id.to_string(),
            };
        };

        let key_results = owner
            .key_results
            .iter()
            .map(|kr| {
                let mut kr = kr.clone();
                if kr.id == kr_id {
                    kr.current += entry.progress_delta;
                }
                kr
            })
            .collect();

        match self
            .tracker
            .objectives()
            .update_locked(&owner.id, ObjectivePatch::key_results(key_results))
        {
            Ok(Some(objective)) => ProgressUpdate::Applied { objective },
            Ok(None) => ProgressUpdate::ObjectiveMissing {
                objective_id: owner.id.clone(),
            },
            Err(e) => {
                warn!(
                    objective_id = %owner.id,
                    error = %e,
                    "Progress update failed after log write"
                );
                ProgressUpdate::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Harness;
    use super::*;
    use crate::model::{
        Category, Collection, KeyResult, KeyResultDraft, ObjectiveDraft, ObjectiveStatus, Quarter,
    };

    fn seed(h: &Harness, current: f64, target: f64) -> Objective {
        let mut kr = KeyResultDraft::new("Chapters written", target);
        kr.current = current;
        h.tracker
            .objectives()
            .add(ObjectiveDraft {
                title: "Write a book".to_string(),
                quarter: Quarter::Q4,
                deadline: "2026-12-31".to_string(),
                category: Category::Personal,
                key_results: vec![kr],
            })
            .unwrap()
    }

    fn draft(kr: Option<&KeyResult>, delta: f64) -> LogDraft {
        LogDraft {
            content: "Wrote some chapters".to_string(),
            date: "Oct 16, 2026".to_string(),
            linked_kr_id: kr.map(|kr| kr.id.clone()),
            progress_delta: delta,
        }
    }

    #[test]
    fn test_unlinked_log_is_stored() {
        let h = Harness::new();
        let outcome = h.tracker.logs().log_and_apply_progress(draft(None, 0.0), &[]).unwrap();
        assert_eq!(outcome.progress, ProgressUpdate::NotRequested);
        assert_eq!(h.tracker.logs().list().unwrap(), vec![outcome.entry]);
    }

    #[test]
    fn test_delta_advances_key_result() {
        let h = Harness::new();
        let o = seed(&h, 2.0, 10.0);
        let snapshot = h.tracker.objectives().all().unwrap();

        let outcome = h
            .tracker
            .logs()
            .log_and_apply_progress(draft(Some(&o.key_results[0]), 3.0), &snapshot)
            .unwrap();

        let ProgressUpdate::Applied { objective } = outcome.progress else {
            panic!("expected progress to apply, got {:?}", outcome.progress);
        };
        assert!((objective.key_results[0].current - 5.0).abs() < f64::EPSILON);
        assert_eq!(objective.status, ObjectiveStatus::InProgress);
        assert_eq!(h.tracker.objectives().get(&o.id).unwrap(), objective);
    }

    #[test]
    fn test_delta_reaching_target_completes() {
        let h = Harness::new();
        let o = seed(&h, 8.0, 10.0);
        let snapshot = h.tracker.objectives().all().unwrap();
        h.tracker
            .logs()
            .log_and_apply_progress(draft(Some(&o.key_results[0]), 5.0), &snapshot)
            .unwrap();

        let stored = h.tracker.objectives().get(&o.id).unwrap();
        // Not clamped
        assert!((stored.key_results[0].current - 13.0).abs() < f64::EPSILON);
        assert_eq!(stored.status, ObjectiveStatus::Completed);
    }

    #[test]
    fn test_negative_delta_does_not_regress_status() {
        let h = Harness::new();
        let o = seed(&h, 10.0, 10.0);
        assert_eq!(o.status, ObjectiveStatus::Completed);
        let snapshot = h.tracker.objectives().all().unwrap();
        h.tracker
            .logs()
            .log_and_apply_progress(draft(Some(&o.key_results[0]), -4.0), &snapshot)
            .unwrap();
        assert_eq!(
            h.tracker.objectives().get(&o.id).unwrap().status,
            ObjectiveStatus::Completed
        );
    }

    #[test]
    fn test_zero_delta_skips_progress() {
        let h = Harness::new();
        let o = seed(&h, 2.0, 10.0);
        let snapshot = h.tracker.objectives().all().unwrap();
        let outcome = h
            .tracker
            .logs()
            .log_and_apply_progress(draft(Some(&o.key_results[0]), 0.0), &snapshot)
            .unwrap();
        assert_eq!(outcome.progress, ProgressUpdate::NotRequested);
        assert_eq!(outcome.entry.linked_kr_id.as_deref(), Some(o.key_results[0].id.as_str()));
    }

    #[test]
    fn test_dangling_link_after_objective_delete() {
        let h = Harness::new();
        let o = seed(&h, 2.0, 10.0);
        let snapshot = h.tracker.objectives().all().unwrap();
        h.tracker
            .logs()
            .log_and_apply_progress(draft(Some(&o.key_results[0]), 1.0), &snapshot)
            .unwrap();

        h.tracker.objectives().delete(&o.id).unwrap();
        let logs = h.tracker.logs().list().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].linked_kr_id.as_deref(), Some(o.key_results[0].id.as_str()));

        // Stale snapshot: the owner is gone by the time the write happens
        let outcome = h
            .tracker
            .logs()
            .log_and_apply_progress(draft(Some(&o.key_results[0]), 1.0), &snapshot)
            .unwrap();
        assert_eq!(
            outcome.progress,
            ProgressUpdate::ObjectiveMissing {
                objective_id: o.id.clone()
            }
        );
        assert_eq!(h.tracker.logs().list().unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_key_result_keeps_log() {
        let h = Harness::new();
        let outcome = h
            .tracker
            .logs()
            .log_and_apply_progress(
                LogDraft {
                    linked_kr_id: Some("kr-missing".to_string()),
                    ..draft(None, 2.0)
                },
                &[],
            )
            .unwrap();
        assert!(matches!(outcome.progress, ProgressUpdate::KeyResultNotFound { .. }));
        assert_eq!(h.tracker.logs().list().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_progress_write_keeps_log() {
        let h = Harness::new();
        let o = seed(&h, 2.0, 10.0);
        let snapshot = h.tracker.objectives().all().unwrap();
        h.blobs.fail_writes(Collection::Objectives.as_str(), true);

        let outcome = h
            .tracker
            .logs()
            .log_and_apply_progress(draft(Some(&o.key_results[0]), 3.0), &snapshot)
            .unwrap();
        assert!(matches!(outcome.progress, ProgressUpdate::Failed { .. }));
        assert_eq!(h.tracker.logs().list().unwrap().len(), 1);
        let stored = h.tracker.objectives().get(&o.id).unwrap();
        assert!((stored.key_results[0].current - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_failed_log_write_is_surfaced() {
        let h = Harness::new();
        h.blobs.fail_writes(Collection::Logs.as_str(), true);
        let err = h
            .tracker
            .logs()
            .log_and_apply_progress(draft(None, 0.0), &[])
            .unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
    }

    #[test]
    fn test_list_is_newest_first() {
        let h = Harness::new();
        let logs = h.tracker.logs();
        let first = logs.log_and_apply_progress(draft(None, 0.0), &[]).unwrap().entry;
        let second = logs.log_and_apply_progress(draft(None, 0.0), &[]).unwrap().entry;
        let listed = logs.list().unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }
}
