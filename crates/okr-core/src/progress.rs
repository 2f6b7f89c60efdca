//! Progress engine: completion percentage, deadlines, quarters, and the
//! status ratchet.
//!
//! Everything here is pure: functions that depend on the clock take `now`
//! or `today` explicitly, with `*_now` wrappers for callers that want the
//! wall clock.

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};

use crate::model::{KeyResult, Objective, ObjectiveStatus, Quarter};

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Completion of a single key result, clamped to `0.0..=100.0`.
///
/// A zero or non-finite target counts as 1; a non-finite current counts as 0.
#[must_use]
pub fn key_result_percent(kr: &KeyResult) -> f64 {
    let target = if kr.target.is_finite() && kr.target.abs() > 0.0 {
        kr.target
    } else {
        1.0
    };
    let current = if kr.current.is_finite() { kr.current } else { 0.0 };
    (current / target * 100.0).clamp(0.0, 100.0)
}

/// Objective completion as an integer percentage in `0..=100`.
///
/// Unweighted mean of the per-key-result percentages, rounded to the
/// nearest integer. A key result with target 1 weighs the same as one with
/// target 1000. Empty input yields 0.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn calculate_progress(key_results: &[KeyResult]) -> u8 {
    if key_results.is_empty() {
        return 0;
    }
    let total: f64 = key_results.iter().map(key_result_percent).sum();
    let mean = total / key_results.len() as f64;
    mean.round().clamp(0.0, 100.0) as u8
}

/// Status after a key-result change.
///
/// One-way ratchet: progress at or above 100 completes the objective,
/// any progress moves `NotStarted` to `InProgress`, nothing ever moves back.
#[must_use]
pub const fn next_status(current: ObjectiveStatus, progress: u8) -> ObjectiveStatus {
    if progress >= 100 {
        ObjectiveStatus::Completed
    } else if progress > 0 && matches!(current, ObjectiveStatus::NotStarted) {
        ObjectiveStatus::InProgress
    } else {
        current
    }
}

/// Re-derive an objective's status from its key results.
pub fn apply_ratchet(objective: &mut Objective) {
    let progress = calculate_progress(&objective.key_results);
    objective.status = next_status(objective.status, progress);
}

/// Parse a deadline as either `YYYY-MM-DD` (midnight UTC) or RFC 3339.
#[must_use]
pub fn parse_deadline(deadline: &str) -> Option<DateTime<Utc>> {
    let trimmed = deadline.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Signed whole days from `now` until the deadline, rounded up.
///
/// Negative means overdue. Absent or unparseable deadlines yield 0.
#[must_use]
pub fn days_left(deadline: Option<&str>, now: DateTime<Utc>) -> i64 {
    let Some(due) = deadline.and_then(parse_deadline) else {
        return 0;
    };
    let diff = (due - now).num_milliseconds();
    let days = diff / MS_PER_DAY;
    if diff % MS_PER_DAY > 0 {
        days + 1
    } else {
        days
    }
}

/// [`days_left`] against the wall clock.
#[must_use]
pub fn days_left_now(deadline: Option<&str>) -> i64 {
    days_left(deadline, Utc::now())
}

/// Last calendar day of the quarter containing `today`.
#[must_use]
pub fn end_of_quarter_date(today: NaiveDate) -> NaiveDate {
    let quarter = Quarter::for_date(today);
    let (year, month) = match quarter {
        Quarter::Q4 => (today.year() + 1, 1),
        q => (today.year(), q.number() * 3 + 1),
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(today)
}

/// Today's local date.
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// End of the current quarter as `YYYY-MM-DD`, the default deadline suggestion.
#[must_use]
pub fn end_of_quarter_string() -> String {
    end_of_quarter_date(today()).format("%Y-%m-%d").to_string()
}

/// Quarter for the current local month.
#[must_use]
pub fn current_quarter() -> Quarter {
    Quarter::for_date(today())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kr(current: f64, target: f64) -> KeyResult {
        KeyResult {
            id: format!("kr-{current}-{target}"),
            title: "kr".to_string(),
            current,
            target,
            unit: String::new(),
        }
    }

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_empty_progress_is_zero() {
        assert_eq!(calculate_progress(&[]), 0);
    }

    #[test]
    fn test_progress_is_mean_of_clamped_percentages() {
        assert_eq!(calculate_progress(&[kr(5.0, 10.0), kr(20.0, 10.0)]), 75);
    }

    #[test]
    fn test_progress_is_unweighted() {
        // 1/1 = 100%, 0/1000 = 0%
        assert_eq!(calculate_progress(&[kr(1.0, 1.0), kr(0.0, 1000.0)]), 50);
    }

    #[test]
    fn test_all_at_or_above_target_is_complete() {
        assert_eq!(calculate_progress(&[kr(10.0, 10.0), kr(300.0, 3.0)]), 100);
    }

    #[test]
    fn test_progress_stays_in_range() {
        let cases = [
            vec![kr(-5.0, 10.0)],
            vec![kr(1e12, 1.0)],
            vec![kr(f64::NAN, 10.0), kr(3.0, f64::NAN)],
            vec![kr(1.0, 0.0), kr(0.0, -4.0)],
        ];
        for krs in &cases {
            let p = calculate_progress(krs);
            assert!(p <= 100, "progress out of range: {p}");
        }
    }

    #[test]
    fn test_zero_target_defaults_to_one() {
        assert_eq!(calculate_progress(&[kr(1.0, 0.0)]), 100);
        assert_eq!(calculate_progress(&[kr(0.5, 0.0)]), 50);
    }

    #[test]
    fn test_progress_rounds_to_nearest() {
        // 1/3 = 33.33..
        assert_eq!(calculate_progress(&[kr(1.0, 3.0)]), 33);
        // 2/3 = 66.66..
        assert_eq!(calculate_progress(&[kr(2.0, 3.0)]), 67);
    }

    #[test]
    fn test_ratchet_advances() {
        use ObjectiveStatus::{Completed, InProgress, NotStarted};
        assert_eq!(next_status(NotStarted, 0), NotStarted);
        assert_eq!(next_status(NotStarted, 1), InProgress);
        assert_eq!(next_status(NotStarted, 100), Completed);
        assert_eq!(next_status(InProgress, 100), Completed);
    }

    #[test]
    fn test_ratchet_never_regresses() {
        use ObjectiveStatus::{Completed, InProgress};
        assert_eq!(next_status(Completed, 40), Completed);
        assert_eq!(next_status(Completed, 0), Completed);
        assert_eq!(next_status(InProgress, 0), InProgress);
    }

    #[test]
    fn test_days_left_future_and_past() {
        let now = at("2024-03-10T12:00:00Z");
        assert_eq!(days_left(Some("2024-03-15"), now), 5);
        assert_eq!(days_left(Some("2024-03-11"), now), 1);
        assert_eq!(days_left(Some("2024-03-01"), now), -9);
        assert!(days_left(Some("2023-12-31"), now) < 0);
    }

    #[test]
    fn test_days_left_same_day_is_zero() {
        let now = at("2024-03-10T12:00:00Z");
        assert_eq!(days_left(Some("2024-03-10"), now), 0);
    }

    #[test]
    fn test_days_left_invalid_or_absent_is_zero() {
        let now = at("2024-03-10T12:00:00Z");
        assert_eq!(days_left(None, now), 0);
        assert_eq!(days_left(Some(""), now), 0);
        assert_eq!(days_left(Some("not a date"), now), 0);
        assert_eq!(days_left(Some("2024-13-45"), now), 0);
    }

    #[test]
    fn test_days_left_accepts_timestamps() {
        let now = at("2024-03-10T00:00:00Z");
        assert_eq!(days_left(Some("2024-03-12T00:00:00Z"), now), 2);
    }

    #[test]
    fn test_end_of_quarter() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(end_of_quarter_date(d(2024, 2, 10)), d(2024, 3, 31));
        assert_eq!(end_of_quarter_date(d(2024, 4, 1)), d(2024, 6, 30));
        assert_eq!(end_of_quarter_date(d(2024, 9, 30)), d(2024, 9, 30));
        assert_eq!(end_of_quarter_date(d(2024, 11, 5)), d(2024, 12, 31));
    }

    #[test]
    fn test_end_of_quarter_string_shape() {
        let s = end_of_quarter_string();
        assert_eq!(s.len(), 10);
        assert!(parse_deadline(&s).is_some());
    }

    #[test]
    fn test_apply_ratchet_on_objective() {
        let mut obj: Objective =
            serde_json::from_value(serde_json::json!({"id": "obj-1"})).unwrap();
        obj.key_results = vec![kr(2.0, 10.0)];
        apply_ratchet(&mut obj);
        assert_eq!(obj.status, ObjectiveStatus::InProgress);

        obj.key_results = vec![kr(10.0, 10.0)];
        apply_ratchet(&mut obj);
        assert_eq!(obj.status, ObjectiveStatus::Completed);

        obj.key_results = vec![kr(1.0, 10.0)];
        apply_ratchet(&mut obj);
        assert_eq!(obj.status, ObjectiveStatus::Completed);
    }
}
