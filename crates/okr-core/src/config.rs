//! Tracker configuration.
//!
//! Each setting is resolved in this order: explicit override (CLI flag),
//! environment variable, built-in default.
//!
//! | Setting          | Variable              | Default                 |
//! |------------------|-----------------------|-------------------------|
//! | data directory   | `OKR_DATA_DIR`        | `$HOME/.okr`            |
//! | remote store     | `OKR_REMOTE`          | `<data_dir>/remote.db`  |
//! | outbox capacity  | `OKR_OUTBOX_CAPACITY` | 256                     |

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::warn;

use crate::outbox::DEFAULT_CAPACITY;

pub const DATA_DIR_VAR: &str = "OKR_DATA_DIR";
pub const REMOTE_VAR: &str = "OKR_REMOTE";
pub const OUTBOX_CAPACITY_VAR: &str = "OKR_OUTBOX_CAPACITY";

const DATA_DIR_NAME: &str = ".okr";
const REMOTE_FILE_NAME: &str = "remote.db";

/// Values given explicitly, typically from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub remote: Option<PathBuf>,
    pub outbox_capacity: Option<usize>,
}

/// Resolved settings for opening a [`Tracker`](crate::core::Tracker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Directory holding the local collection blobs.
    pub data_dir: PathBuf,
    /// Path of the SQLite remote document store.
    pub remote_path: PathBuf,
    pub outbox_capacity: usize,
}

impl TrackerConfig {
    /// Settings rooted at `data_dir` with every other value defaulted.
    #[must_use]
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            remote_path: data_dir.join(REMOTE_FILE_NAME),
            outbox_capacity: DEFAULT_CAPACITY,
        }
    }

    /// Resolve settings from overrides and the process environment.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self> {
        Self::resolve_with(overrides, |name| env::var(name).ok())
    }

    /// Resolve settings against an arbitrary variable lookup.
    pub fn resolve_with(
        overrides: ConfigOverrides,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let lookup = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        let data_dir = match overrides.data_dir {
            Some(dir) => dir,
            None => match lookup(DATA_DIR_VAR) {
                Some(dir) => PathBuf::from(dir),
                None => default_data_dir(&lookup)?,
            },
        };

        let remote_path = overrides
            .remote
            .or_else(|| lookup(REMOTE_VAR).map(PathBuf::from))
            .unwrap_or_else(|| data_dir.join(REMOTE_FILE_NAME));

        let outbox_capacity = overrides
            .outbox_capacity
            .or_else(|| {
                let raw = lookup(OUTBOX_CAPACITY_VAR)?;
                match raw.trim().parse::<usize>() {
                    Ok(n) if n > 0 => Some(n),
                    _ => {
                        warn!(value = %raw, "Ignoring invalid {OUTBOX_CAPACITY_VAR}");
                        None
                    }
                }
            })
            .unwrap_or(DEFAULT_CAPACITY);

        Ok(Self {
            data_dir,
            remote_path,
            outbox_capacity,
        })
    }
}

fn default_data_dir(lookup: &impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    let Some(home) = lookup("HOME").or_else(|| lookup("USERPROFILE")) else {
        bail!("Cannot locate a home directory. Set {DATA_DIR_VAR} or pass --data-dir.");
    };
    Ok(PathBuf::from(home).join(DATA_DIR_NAME))
}
