//! Implementation of `okr stats`.

use anyhow::Result;
use chrono::Utc;

use crate::output::{Formatter, OutputFormat};
use okr_core::core::Tracker;
use okr_core::dashboard::{DashboardStats, ObjectiveFilter};
use okr_core::model::Quarter;

/// Print dashboard stats, optionally for one quarter.
#[tracing::instrument(skip(tracker, format))]
pub fn run_stats(tracker: &Tracker, quarter: Option<Quarter>, format: OutputFormat) -> Result<()> {
    let objectives = tracker.objectives().list(&ObjectiveFilter {
        quarter,
        ..ObjectiveFilter::default()
    })?;
    let stats = DashboardStats::compute(&objectives, Utc::now());
    Formatter::new(format).print(&stats)
}
