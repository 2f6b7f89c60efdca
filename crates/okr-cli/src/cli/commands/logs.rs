//! Implementation of `okr log` subcommands.

use anyhow::Result;
use serde::Serialize;

use crate::output::{Formatter, OutputFormat};
use okr_core::core::{ProgressUpdate, Tracker};
use okr_core::dashboard::{LogSummary, ObjectiveSummary};
use okr_core::model::LogDraft;
use okr_core::progress::today;

/// Display date for entries logged without one, e.g. "Oct 16, 2026".
#[must_use]
pub fn default_log_date() -> String {
    today().format("%b %-d, %Y").to_string()
}

#[derive(Debug, Serialize)]
struct LogAdded {
    #[serde(flatten)]
    entry: LogSummary,
    progress: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    objective: Option<ObjectiveSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Record a log entry and apply its delta.
#[tracing::instrument(skip(tracker, content, format))]
pub fn run_log_add(
    tracker: &Tracker,
    content: &str,
    kr_id: Option<String>,
    delta: f64,
    date: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let snapshot = tracker.objectives().all()?;
    let outcome = tracker.logs().log_and_apply_progress(
        LogDraft {
            content: content.to_string(),
            date: date.unwrap_or_else(default_log_date),
            linked_kr_id: kr_id,
            progress_delta: delta,
        },
        &snapshot,
    )?;

    let now = chrono::Utc::now();
    let objectives = tracker.objectives().all()?;
    let (progress, objective, error) = match outcome.progress {
        ProgressUpdate::NotRequested => ("not_requested", None, None),
        ProgressUpdate::Applied { objective } => {
            ("applied", Some(ObjectiveSummary::new(&objective, now)), None)
        }
        ProgressUpdate::KeyResultNotFound { .. } => ("key_result_not_found", None, None),
        ProgressUpdate::ObjectiveMissing { .. } => ("objective_missing", None, None),
        ProgressUpdate::Failed { error } => ("failed", None, Some(error)),
    };

    Formatter::new(format).print(&LogAdded {
        entry: LogSummary::new(&outcome.entry, &objectives),
        progress,
        objective,
        error,
    })
}

/// List log entries, newest first.
#[tracing::instrument(skip(tracker, format))]
pub fn run_log_list(tracker: &Tracker, format: OutputFormat) -> Result<()> {
    let objectives = tracker.objectives().all()?;
    let logs: Vec<LogSummary> = tracker
        .logs()
        .list()?
        .iter()
        .map(|entry| LogSummary::new(entry, &objectives))
        .collect();

    Formatter::new(format).print_list(
        &logs,
        "No log entries yet. Add one with 'okr log add <text>'.",
        "logs",
    )
}
