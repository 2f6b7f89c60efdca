//! Domain types for objectives, key results, and log entries.
//!
//! The serialized form (local blobs and remote documents) keeps the
//! camelCase field names of the stored data: `keyResults`, `createdAt`,
//! `linkedKRId`, `progressDelta`.

pub mod ids;

pub use ids::{is_key_result_id, is_objective_id, new_key_result_id, new_log_id, new_objective_id};

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Collections
// ============================================================================

/// The two persisted collections. Used as the local blob key and the
/// remote sub-collection name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Objectives,
    Logs,
}

impl Collection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Objectives => "objectives",
            Self::Logs => "logs",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A top-level stored entity: addressable by id, ordered by creation time.
pub trait Document: Serialize + DeserializeOwned + Clone {
    /// Collection this document type lives in.
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    fn created_at(&self) -> DateTime<Utc>;
}

// ============================================================================
// Enums
// ============================================================================

/// Calendar quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    /// Quarter containing the given month (1-12). Out-of-range months clamp.
    #[must_use]
    pub const fn for_month(month: u32) -> Self {
        match month {
            0..=3 => Self::Q1,
            4..=6 => Self::Q2,
            7..=9 => Self::Q3,
            _ => Self::Q4,
        }
    }

    #[must_use]
    pub fn for_date(date: NaiveDate) -> Self {
        Self::for_month(date.month())
    }

    /// 1-based quarter number.
    #[must_use]
    pub const fn number(self) -> u32 {
        match self {
            Self::Q1 => 1,
            Self::Q2 => 2,
            Self::Q3 => 3,
            Self::Q4 => 4,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Q1 => "Q1",
            Self::Q2 => "Q2",
            Self::Q3 => "Q3",
            Self::Q4 => "Q4",
        }
    }
}

impl Default for Quarter {
    fn default() -> Self {
        Self::for_date(Utc::now().date_naive())
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quarter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "Q1" => Ok(Self::Q1),
            "Q2" => Ok(Self::Q2),
            "Q3" => Ok(Self::Q3),
            "Q4" => Ok(Self::Q4),
            other => Err(format!("unknown quarter: {other}")),
        }
    }
}

/// Objective category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Category {
    #[default]
    Work,
    Personal,
    Health,
    Finance,
    Learning,
}

impl Category {
    pub const ALL: [Self; 5] = [
        Self::Work,
        Self::Personal,
        Self::Health,
        Self::Finance,
        Self::Learning,
    ];

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::Personal => "Personal",
            Self::Health => "Health",
            Self::Finance => "Finance",
            Self::Learning => "Learning",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

/// Objective completion status. Advances only through the ratchet in
/// [`crate::progress::next_status`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectiveStatus {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl ObjectiveStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for ObjectiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A measurable sub-target of an objective. Owned by its objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyResult {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::current")]
    pub current: f64,
    #[serde(default = "lenient::default_target", deserialize_with = "lenient::target")]
    pub target: f64,
    #[serde(default)]
    pub unit: String,
}

/// A top-level goal with a deadline and quarter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub quarter: Quarter,
    /// Calendar date, `YYYY-MM-DD`.
    #[serde(default)]
    pub deadline: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub status: ObjectiveStatus,
    #[serde(default)]
    pub key_results: Vec<KeyResult>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl Objective {
    /// Find a key result by id.
    #[must_use]
    pub fn key_result(&self, kr_id: &str) -> Option<&KeyResult> {
        self.key_results.iter().find(|kr| kr.id == kr_id)
    }

    #[must_use]
    pub fn has_key_result(&self, kr_id: &str) -> bool {
        self.key_result(kr_id).is_some()
    }
}

impl Document for Objective {
    const COLLECTION: Collection = Collection::Objectives;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A free-text journal record, optionally linked to a key result.
///
/// Immutable once created. `linked_kr_id` is a weak reference and may
/// dangle after the key result is deleted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    #[serde(default)]
    pub content: String,
    /// Display-formatted date as entered.
    #[serde(default)]
    pub date: String,
    #[serde(rename = "linkedKRId", default)]
    pub linked_kr_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::current")]
    pub progress_delta: f64,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl Document for LogEntry {
    const COLLECTION: Collection = Collection::Logs;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

// ============================================================================
// Inputs
// ============================================================================

/// Input for a new key result.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyResultDraft {
    pub title: String,
    pub current: f64,
    pub target: f64,
    pub unit: String,
}

impl KeyResultDraft {
    #[must_use]
    pub fn new(title: impl Into<String>, target: f64) -> Self {
        Self {
            title: title.into(),
            current: 0.0,
            target,
            unit: String::new(),
        }
    }
}

/// Field-level edits to a key result. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyResultPatch {
    pub title: Option<String>,
    pub current: Option<f64>,
    pub target: Option<f64>,
    pub unit: Option<String>,
}

/// Input for a new objective.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveDraft {
    pub title: String,
    pub quarter: Quarter,
    pub deadline: String,
    pub category: Category,
    pub key_results: Vec<KeyResultDraft>,
}

/// Shallow merge of objective fields. `None` leaves a field unchanged.
///
/// Status is not patchable; it is re-derived whenever `key_results` is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectivePatch {
    pub title: Option<String>,
    pub quarter: Option<Quarter>,
    pub deadline: Option<String>,
    pub category: Option<Category>,
    pub key_results: Option<Vec<KeyResult>>,
}

impl ObjectivePatch {
    #[must_use]
    pub fn key_results(key_results: Vec<KeyResult>) -> Self {
        Self {
            key_results: Some(key_results),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.quarter.is_none()
            && self.deadline.is_none()
            && self.category.is_none()
            && self.key_results.is_none()
    }
}

/// Input for a new log entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogDraft {
    pub content: String,
    pub date: String,
    pub linked_kr_id: Option<String>,
    pub progress_delta: f64,
}

// ============================================================================
// Lenient numeric fields
// ============================================================================

/// Stored numbers may arrive as JSON numbers, numeric strings, or junk.
mod lenient {
    use super::{Deserialize, Deserializer};
    use serde_json::Value;

    fn parse(value: Option<Value>) -> Option<f64> {
        let n = match value? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        n.filter(|v| v.is_finite())
    }

    pub const fn default_target() -> f64 {
        1.0
    }

    pub fn current<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(parse(Option::<Value>::deserialize(d)?).unwrap_or(0.0))
    }

    pub fn target<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(parse(Option::<Value>::deserialize(d)?).unwrap_or_else(default_target))
    }
}
