//! Objective service: create, update, delete, and query objectives.

use chrono::Utc;
use tracing::{debug, info};

use crate::dashboard::ObjectiveFilter;
use crate::model::{
    new_key_result_id, new_objective_id, Collection, KeyResult, KeyResultDraft, Objective,
    ObjectiveDraft, ObjectivePatch, ObjectiveStatus,
};
use crate::progress::apply_ratchet;

use super::{validate, CoreError, CoreResult, Tracker};

/// Service for objective operations.
pub struct ObjectiveService<'a> {
    tracker: &'a Tracker,
}

impl<'a> ObjectiveService<'a> {
    pub(crate) const fn new(tracker: &'a Tracker) -> Self {
        Self { tracker }
    }

    /// All objectives in stored order (newest first).
    pub fn all(&self) -> CoreResult<Vec<Objective>> {
        self.tracker.local().objectives().map_err(CoreError::Internal)
    }

    /// Objectives matching a quarter/status filter, in stored order.
    pub fn list(&self, filter: &ObjectiveFilter) -> CoreResult<Vec<Objective>> {
        let mut objectives = self.all()?;
        objectives.retain(|o| filter.matches(o));
        Ok(objectives)
    }

    /// Get a single objective.
    ///
    /// Returns `Err(CoreError::NotFound)` if the objective does not exist.
    pub fn get(&self, id: &str) -> CoreResult<Objective> {
        self.all()?
            .into_iter()
            .find(|o| o.id == id)
            .ok_or_else(|| CoreError::not_found("Objective", id))
    }

    /// Create an objective and prepend it to the collection.
    pub fn add(&self, draft: ObjectiveDraft) -> CoreResult<Objective> {
        validate::objective_draft(&draft)?;

        let key_results = draft
            .key_results
            .into_iter()
            .map(key_result_from_draft)
            .collect::<CoreResult<Vec<_>>>()?;
        let mut objective = Objective {
            id: new_objective_id().map_err(CoreError::Internal)?,
            title: draft.title.trim().to_string(),
            quarter: draft.quarter,
            deadline: draft.deadline.trim().to_string(),
            category: draft.category,
            status: ObjectiveStatus::NotStarted,
            key_results,
            created_at: Utc::now(),
        };
        apply_ratchet(&mut objective);

        let _gate = self.tracker.write_gate();
        let mut objectives = self.all()?;
        objectives.insert(0, objective.clone());
        self.tracker
            .local()
            .replace_all(&objectives)
            .map_err(CoreError::Internal)?;
        self.tracker.mirror_put(&objective);

        info!(id = %objective.id, title = %objective.title, "Added objective");
        Ok(objective)
    }

    /// Shallow-merge `patch` into an objective.
    ///
    /// Returns `Ok(None)` without writing anything if the objective does not
    /// exist. When the patch replaces the key results, status is re-derived.
    pub fn update(&self, id: &str, patch: ObjectivePatch) -> CoreResult<Option<Objective>> {
        let _gate = self.tracker.write_gate();
        self.update_locked(id, patch)
    }

    /// [`update`](Self::update) for callers already holding the write gate.
    pub(crate) fn update_locked(
        &self,
        id: &str,
        patch: ObjectivePatch,
    ) -> CoreResult<Option<Objective>> {
        validate::objective_patch(&patch)?;

        let mut objectives = self.all()?;
        let Some(objective) = objectives.iter_mut().find(|o| o.id == id) else {
            debug!(id, "Update of unknown objective ignored");
            return Ok(None);
        };

        if let Some(title) = patch.title {
            objective.title = title.trim().to_string();
        }
        if let Some(quarter) = patch.quarter {
            objective.quarter = quarter;
        }
        if let Some(deadline) = patch.deadline {
            objective.deadline = deadline.trim().to_string();
        }
        if let Some(category) = patch.category {
            objective.category = category;
        }
        if let Some(key_results) = patch.key_results {
            objective.key_results = key_results;
            apply_ratchet(objective);
        }
        let updated = objective.clone();

        self.tracker
            .local()
            .replace_all(&objectives)
            .map_err(CoreError::Internal)?;
        self.tracker.mirror_put(&updated);

        debug!(id, status = %updated.status, "Updated objective");
        Ok(Some(updated))
    }

    /// Delete an objective and queue its remote delete.
    ///
    /// Logs linked to its key results are left in place. Returns whether a
    /// local objective was removed.
    pub fn delete(&self, id: &str) -> CoreResult<bool> {
        let _gate = self.tracker.write_gate();
        let mut objectives = self.all()?;
        let before = objectives.len();
        objectives.retain(|o| o.id != id);
        let removed = objectives.len() != before;

        if removed {
            self.tracker
                .local()
                .replace_all(&objectives)
                .map_err(CoreError::Internal)?;
            info!(id, "Deleted objective");
        } else {
            debug!(id, "Delete of unknown objective, clearing remote copy only");
        }
        self.tracker.mirror_delete(Collection::Objectives, id);
        Ok(removed)
    }
}

pub(crate) fn key_result_from_draft(draft: KeyResultDraft) -> CoreResult<KeyResult> {
    Ok(KeyResult {
        id: new_key_result_id().map_err(CoreError::Internal)?,
        title: draft.title.trim().to_string(),
        current: draft.current,
        target: draft.target,
        unit: draft.unit.trim().to_string(),
    })
}
