//! Implementation of `okr objectives` subcommands.

use anyhow::Result;
use chrono::Utc;

use crate::cli::commands::helpers::{objective_not_found_error, parse_key_result_spec};
use crate::output::{Formatter, OutputFormat};
use okr_core::core::Tracker;
use okr_core::dashboard::{ObjectiveFilter, ObjectiveSummary, StatusFilter};
use okr_core::model::{Category, ObjectiveDraft, ObjectivePatch, Quarter};
use okr_core::progress::{current_quarter, end_of_quarter_string};

/// Create an objective.
#[tracing::instrument(skip(tracker, key_results, format))]
pub fn run_objectives_add(
    tracker: &Tracker,
    title: &str,
    deadline: Option<String>,
    quarter: Option<Quarter>,
    category: Category,
    key_results: &[String],
    format: OutputFormat,
) -> Result<()> {
    let key_results = key_results
        .iter()
        .map(|spec| parse_key_result_spec(spec.as_str()))
        .collect::<Result<Vec<_>>>()?;

    let objective = tracker.objectives().add(ObjectiveDraft {
        title: title.to_string(),
        quarter: quarter.unwrap_or_else(current_quarter),
        deadline: deadline.unwrap_or_else(end_of_quarter_string),
        category,
        key_results,
    })?;

    Formatter::new(format).print(&ObjectiveSummary::new(&objective, Utc::now()))
}

/// List objectives matching the filters.
#[tracing::instrument(skip(tracker, format))]
pub fn run_objectives_list(
    tracker: &Tracker,
    quarter: Option<Quarter>,
    status: StatusFilter,
    format: OutputFormat,
) -> Result<()> {
    let objectives = tracker
        .objectives()
        .list(&ObjectiveFilter { quarter, status })?;
    let now = Utc::now();
    let summaries: Vec<ObjectiveSummary> = objectives
        .iter()
        .map(|o| ObjectiveSummary::new(o, now))
        .collect();

    Formatter::new(format).print_list(
        &summaries,
        "No objectives yet. Add one with 'okr objectives add --title <title>'.",
        "objectives",
    )
}

/// Show one objective.
#[tracing::instrument(skip(tracker, format))]
pub fn run_objectives_show(
    tracker: &Tracker,
    objective_id: &str,
    format: OutputFormat,
) -> Result<()> {
    let objective = tracker.objectives().get(objective_id)?;
    let summary = ObjectiveSummary::new(&objective, Utc::now());
    let formatter = Formatter::new(format);
    if formatter.is_json() {
        return formatter.print(&summary);
    }

    let kr_lines = summary.key_results.clone();
    formatter.print(&ObjectiveSummary {
        key_results: Vec::new(),
        ..summary
    })?;
    formatter.print(&kr_lines)
}

/// Change objective fields.
#[tracing::instrument(skip(tracker, patch, format))]
pub fn run_objectives_update(
    tracker: &Tracker,
    objective_id: &str,
    patch: ObjectivePatch,
    format: OutputFormat,
) -> Result<()> {
    let Some(objective) = tracker.objectives().update(objective_id, patch)? else {
        return Err(objective_not_found_error(objective_id));
    };
    Formatter::new(format).print(&ObjectiveSummary::new(&objective, Utc::now()))
}

/// Delete an objective.
#[tracing::instrument(skip(tracker, format))]
pub fn run_objectives_delete(
    tracker: &Tracker,
    objective_id: &str,
    format: OutputFormat,
) -> Result<()> {
    if !tracker.objectives().delete(objective_id)? {
        return Err(objective_not_found_error(objective_id));
    }
    Formatter::new(format).print(&serde_json::json!({
        "id": objective_id,
        "deleted": true,
    }))
}
