//! Key result service.
//!
//! Key results live inside their objective, so every change here rewrites
//! the objective's whole `key_results` sequence through the objective
//! update path, which also re-derives status.

use tracing::debug;

use crate::model::{KeyResult, KeyResultDraft, KeyResultPatch, Objective, ObjectivePatch};

use super::objectives::key_result_from_draft;
use super::{validate, CoreResult, Tracker};

/// Service for key result operations.
pub struct KeyResultService<'a> {
    tracker: &'a Tracker,
}

impl<'a> KeyResultService<'a> {
    pub(crate) const fn new(tracker: &'a Tracker) -> Self {
        Self { tracker }
    }

    fn find_objective(&self, objective_id: &str) -> CoreResult<Option<Objective>> {
        Ok(self
            .tracker
            .objectives()
            .all()?
            .into_iter()
            .find(|o| o.id == objective_id))
    }

    /// Append a key result to an objective.
    ///
    /// Returns `Ok(None)` if the objective does not exist.
    pub fn add(&self, objective_id: &str, draft: KeyResultDraft) -> CoreResult<Option<KeyResult>> {
        validate::key_result_draft(&draft)?;
        let kr = key_result_from_draft(draft)?;

        let _gate = self.tracker.write_gate();
        let Some(objective) = self.find_objective(objective_id)? else {
            debug!(objective_id, "Key result add on unknown objective ignored");
            return Ok(None);
        };

        let mut key_results = objective.key_results;
        key_results.push(kr.clone());
        Ok(self
            .tracker
            .objectives()
            .update_locked(objective_id, ObjectivePatch::key_results(key_results))?
            .map(|_| kr))
    }

    /// Edit one key result in place.
    ///
    /// Returns `Ok(None)` if the objective or key result does not exist.
    pub fn edit(
        &self,
        objective_id: &str,
        kr_id: &str,
        patch: KeyResultPatch,
    ) -> CoreResult<Option<KeyResult>> {
        validate::key_result_patch(&patch)?;

        let _gate = self.tracker.write_gate();
        let Some(objective) = self.find_objective(objective_id)? else {
            debug!(objective_id, kr_id, "Key result edit on unknown objective ignored");
            return Ok(None);
        };

        let mut key_results = objective.key_results;
        let Some(kr) = key_results.iter_mut().find(|kr| kr.id == kr_id) else {
            debug!(objective_id, kr_id, "Edit of unknown key result ignored");
            return Ok(None);
        };
        if let Some(title) = patch.title {
            kr.title = title.trim().to_string();
        }
        if let Some(current) = patch.current {
            kr.current = current;
        }
        if let Some(target) = patch.target {
            kr.target = target;
        }
        if let Some(unit) = patch.unit {
            kr.unit = unit.trim().to_string();
        }
        let edited = kr.clone();

        Ok(self
            .tracker
            .objectives()
            .update_locked(objective_id, ObjectivePatch::key_results(key_results))?
            .map(|_| edited))
    }

    /// Remove a key result. Logs linked to it keep their dangling id.
    ///
    /// Returns whether a key result was removed.
    pub fn delete(&self, objective_id: &str, kr_id: &str) -> CoreResult<bool> {
        let _gate = self.tracker.write_gate();
        let Some(objective) = self.find_objective(objective_id)? else {
            return Ok(false);
        };

        let mut key_results = objective.key_results;
        let before = key_results.len();
        key_results.retain(|kr| kr.id != kr_id);
        if key_results.len() == before {
            debug!(objective_id, kr_id, "Delete of unknown key result ignored");
            return Ok(false);
        }

        Ok(self
            .tracker
            .objectives()
            .update_locked(objective_id, ObjectivePatch::key_results(key_results))?
            .is_some())
    }
}
