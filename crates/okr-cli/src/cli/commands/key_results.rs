//! Implementation of `okr kr` subcommands.

use anyhow::{anyhow, Result};

use crate::cli::commands::helpers::objective_not_found_error;
use crate::output::{Formatter, OutputFormat};
use okr_core::core::Tracker;
use okr_core::dashboard::KeyResultSummary;
use okr_core::model::{KeyResultDraft, KeyResultPatch};

fn key_result_not_found_error(objective_id: &str, kr_id: &str) -> anyhow::Error {
    anyhow!(
        "Key result {kr_id} not found on objective {objective_id}. \
         Run 'okr objectives show {objective_id}'."
    )
}

/// Add a key result.
#[tracing::instrument(skip(tracker, draft, format))]
pub fn run_kr_add(
    tracker: &Tracker,
    objective_id: &str,
    draft: KeyResultDraft,
    format: OutputFormat,
) -> Result<()> {
    let Some(kr) = tracker.key_results().add(objective_id, draft)? else {
        return Err(objective_not_found_error(objective_id));
    };
    Formatter::new(format).print(&KeyResultSummary::from(&kr))
}

/// Edit a key result.
#[tracing::instrument(skip(tracker, patch, format))]
pub fn run_kr_edit(
    tracker: &Tracker,
    objective_id: &str,
    kr_id: &str,
    patch: KeyResultPatch,
    format: OutputFormat,
) -> Result<()> {
    let Some(kr) = tracker.key_results().edit(objective_id, kr_id, patch)? else {
        return Err(key_result_not_found_error(objective_id, kr_id));
    };
    Formatter::new(format).print(&KeyResultSummary::from(&kr))
}

/// Delete a key result.
#[tracing::instrument(skip(tracker, format))]
pub fn run_kr_delete(
    tracker: &Tracker,
    objective_id: &str,
    kr_id: &str,
    format: OutputFormat,
) -> Result<()> {
    if !tracker.key_results().delete(objective_id, kr_id)? {
        return Err(key_result_not_found_error(objective_id, kr_id));
    }
    Formatter::new(format).print(&serde_json::json!({
        "id": kr_id,
        "objective_id": objective_id,
        "deleted": true,
    }))
}
