//! Read-side views over objectives and logs: filters, summary stats, and
//! log-to-key-result link resolution.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{KeyResult, LogEntry, Objective, ObjectiveStatus, Quarter};
use crate::progress::{calculate_progress, days_left, key_result_percent};

/// Days-left threshold below which an unfinished objective is critical.
pub const CRITICAL_DAYS: i64 = 7;

/// Label shown for a log whose key result no longer exists.
pub const DELETED_KEY_RESULT: &str = "Deleted Key Result";

/// Status filter for objective listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum StatusFilter {
    #[default]
    All,
    /// Anything not yet completed.
    Active,
    NotStarted,
    InProgress,
    Completed,
}

impl StatusFilter {
    #[must_use]
    pub fn matches(self, status: ObjectiveStatus) -> bool {
        match self {
            Self::All => true,
            Self::Active => status != ObjectiveStatus::Completed,
            Self::NotStarted => status == ObjectiveStatus::NotStarted,
            Self::InProgress => status == ObjectiveStatus::InProgress,
            Self::Completed => status == ObjectiveStatus::Completed,
        }
    }
}

/// Objective listing filter. `quarter: None` means all quarters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectiveFilter {
    pub quarter: Option<Quarter>,
    pub status: StatusFilter,
}

impl ObjectiveFilter {
    #[must_use]
    pub fn matches(&self, objective: &Objective) -> bool {
        self.quarter.is_none_or(|q| objective.quarter == q) && self.status.matches(objective.status)
    }
}

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    /// Mean objective progress, rounded. 0 with no objectives.
    pub completion: u8,
    /// Objectives in progress.
    pub active: usize,
    /// Unfinished objectives due within [`CRITICAL_DAYS`].
    pub critical: usize,
}

impl DashboardStats {
    #[must_use]
    pub fn compute(objectives: &[Objective], now: DateTime<Utc>) -> Self {
        if objectives.is_empty() {
            return Self::default();
        }

        let mut sum = 0u64;
        let mut active = 0;
        let mut critical = 0;
        for objective in objectives {
            let progress = calculate_progress(&objective.key_results);
            sum += u64::from(progress);
            if objective.status == ObjectiveStatus::InProgress {
                active += 1;
            }
            if progress < 100 && days_left(Some(&objective.deadline), now) < CRITICAL_DAYS {
                critical += 1;
            }
        }

        let count = objectives.len() as u64;
        // Mean of values in 0..=100 stays in range
        let completion = u8::try_from((sum + count / 2) / count).unwrap_or(100);

        Self {
            total: objectives.len(),
            completion,
            active,
            critical,
        }
    }
}

/// Display projection of one objective.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveSummary {
    pub id: String,
    pub title: String,
    pub quarter: Quarter,
    pub category: String,
    pub status: ObjectiveStatus,
    pub deadline: String,
    pub days_left: i64,
    pub progress: u8,
    pub key_results: Vec<KeyResultSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyResultSummary {
    pub id: String,
    pub title: String,
    pub current: f64,
    pub target: f64,
    pub unit: String,
    pub percent: u8,
}

impl From<&KeyResult> for KeyResultSummary {
    fn from(kr: &KeyResult) -> Self {
        Self {
            id: kr.id.clone(),
            title: kr.title.clone(),
            current: kr.current,
            target: kr.target,
            unit: kr.unit.clone(),
            percent: percent_u8(key_result_percent(kr)),
        }
    }
}

impl ObjectiveSummary {
    #[must_use]
    pub fn new(objective: &Objective, now: DateTime<Utc>) -> Self {
        Self {
            id: objective.id.clone(),
            title: objective.title.clone(),
            quarter: objective.quarter,
            category: objective.category.label().to_string(),
            status: objective.status,
            deadline: objective.deadline.clone(),
            days_left: days_left(Some(&objective.deadline), now),
            progress: calculate_progress(&objective.key_results),
            key_results: objective.key_results.iter().map(KeyResultSummary::from).collect(),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent_u8(percent: f64) -> u8 {
    percent.round().clamp(0.0, 100.0) as u8
}

/// Where a log's key result link points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkedKeyResult<'a> {
    Unlinked,
    Linked(&'a str),
    /// The id no longer resolves.
    Deleted,
}

impl<'a> LinkedKeyResult<'a> {
    /// Text to show next to the log, if any.
    #[must_use]
    pub const fn label(self) -> Option<&'a str> {
        match self {
            Self::Unlinked => None,
            Self::Linked(title) => Some(title),
            Self::Deleted => Some(DELETED_KEY_RESULT),
        }
    }
}

/// Resolve a log's linked key result against the current objectives.
#[must_use]
pub fn linked_key_result<'a>(
    objectives: &'a [Objective],
    kr_id: Option<&str>,
) -> LinkedKeyResult<'a> {
    let Some(kr_id) = kr_id.filter(|id| !id.is_empty()) else {
        return LinkedKeyResult::Unlinked;
    };
    objectives
        .iter()
        .find_map(|o| o.key_result(kr_id))
        .map_or(LinkedKeyResult::Deleted, |kr| LinkedKeyResult::Linked(&kr.title))
}

/// Display projection of one log entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogSummary {
    pub id: String,
    pub date: String,
    pub content: String,
    pub linked_key_result: Option<String>,
    pub progress_delta: f64,
    pub created_at: DateTime<Utc>,
}

impl LogSummary {
    #[must_use]
    pub fn new(entry: &LogEntry, objectives: &[Objective]) -> Self {
        Self {
            id: entry.id.clone(),
            date: entry.date.clone(),
            content: entry.content.clone(),
            linked_key_result: linked_key_result(objectives, entry.linked_kr_id.as_deref())
                .label()
                .map(str::to_string),
            progress_delta: entry.progress_delta,
            created_at: entry.created_at,
        }
    }
}
