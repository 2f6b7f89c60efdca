//! Shared helpers for CLI commands.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, warn};

use okr_core::config::{ConfigOverrides, TrackerConfig};
use okr_core::core::{CoreResult, Tracker};
use okr_core::identity::{resolve_owner, AuthEvent};
use okr_core::model::KeyResultDraft;
use okr_core::outbox::{Delivery, DeliveryReport};
use okr_core::sync::SyncReport;

/// Resolve configuration and open the tracker.
pub fn open_tracker(data_dir: Option<PathBuf>, remote: Option<PathBuf>) -> Result<Tracker> {
    let config = TrackerConfig::resolve(ConfigOverrides {
        data_dir,
        remote,
        outbox_capacity: None,
    })?;
    Tracker::open(&config)
        .with_context(|| format!("Failed to open okr data in {}", config.data_dir.display()))
}

/// Sign in the resolved owner, which runs the sign-in sync.
///
/// Returns `None` when no owner is configured: the run stays local.
pub fn sign_in(tracker: &Tracker, explicit: Option<&str>) -> Option<CoreResult<SyncReport>> {
    let owner_id = resolve_owner(explicit)?;
    debug!(owner = %owner_id, "Signing in");
    tracker
        .sync()
        .handle_auth_event(&AuthEvent::SignedIn { owner_id })
        .transpose()
}

/// Deliver queued remote writes, warning once if any did not make it.
pub fn flush_outbox(tracker: &Tracker) {
    let lost = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&lost);
    tracker.set_outbox_observer(Arc::new(move |report: &DeliveryReport| {
        if !matches!(report.outcome, Delivery::Delivered) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }));

    let report = tracker.flush_outbox();
    debug!(delivered = report.delivered, failed = report.failed, "Flushed outbox");

    let lost = lost.load(Ordering::Relaxed);
    if lost > 0 {
        warn!(
            count = lost,
            "Some changes were saved locally but not mirrored to the remote store"
        );
    }
}

/// Parse `TITLE=TARGET[:UNIT]` into a key result draft.
pub fn parse_key_result_spec(spec: &str) -> Result<KeyResultDraft> {
    let Some((title, rest)) = spec.rsplit_once('=') else {
        bail!("Invalid key result '{spec}': expected TITLE=TARGET[:UNIT]");
    };
    let (target, unit) = rest.split_once(':').unwrap_or((rest, ""));
    let target: f64 = target
        .trim()
        .parse()
        .map_err(|_| anyhow!("Invalid key result target in '{spec}': {target}"))?;

    let mut draft = KeyResultDraft::new(title.trim(), target);
    draft.unit = unit.trim().to_string();
    Ok(draft)
}

/// Error for an objective id that does not resolve.
#[must_use]
pub fn objective_not_found_error(objective_id: &str) -> anyhow::Error {
    anyhow!("Objective not found: {objective_id}. Run 'okr objectives list' to see ids.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use okr_core::local::{LocalStore, MemoryBlobStore};
    use okr_core::remote::MemoryRemoteStore;
    use tempfile::tempdir;

    #[test]
    fn test_parse_key_result_spec() {
        let draft = parse_key_result_spec("Read books=12:books").unwrap();
        assert_eq!(draft.title, "Read books");
        assert!((draft.target - 12.0).abs() < f64::EPSILON);
        assert_eq!(draft.unit, "books");

        let plain = parse_key_result_spec("Run = 5").unwrap();
        assert_eq!(plain.title, "Run");
        assert!(plain.unit.is_empty());

        assert!(parse_key_result_spec("no target").is_err());
        assert!(parse_key_result_spec("x=lots").is_err());
    }

    #[test]
    fn test_open_tracker_in_data_dir() {
        let dir = tempdir().unwrap();
        let tracker = open_tracker(Some(dir.path().join("data")), None).unwrap();
        assert!(tracker.objectives().all().unwrap().is_empty());
        assert!(dir.path().join("data").join("remote.db").exists());
    }

    #[test]
    fn test_sign_in_with_explicit_owner_syncs() {
        let tracker = Tracker::new(
            LocalStore::new(MemoryBlobStore::new()),
            Arc::new(MemoryRemoteStore::new()),
            8,
        );
        let report = sign_in(&tracker, Some("u1")).unwrap().unwrap();
        assert_eq!(report.owner, "u1");
        assert_eq!(tracker.owner().as_deref(), Some("u1"));
    }
}
