//! Implementation of `okr sync`.

use anyhow::Result;

use crate::output::{Formatter, OutputFormat};
use okr_core::core::{CoreResult, Tracker};
use okr_core::sync::SyncReport;

/// Report the sign-in sync, or run one if sign-in did not.
///
/// `startup` is the outcome of the sign-in done before dispatch: `None` means
/// no sync ran then (no owner, or the session was unchanged).
#[tracing::instrument(skip(tracker, startup, format))]
pub fn run_sync(
    tracker: &Tracker,
    startup: Option<CoreResult<SyncReport>>,
    format: OutputFormat,
) -> Result<()> {
    let report = match startup {
        Some(result) => result?,
        None => tracker.sync().sync_now()?,
    };
    Formatter::new(format).print(&report)
}
