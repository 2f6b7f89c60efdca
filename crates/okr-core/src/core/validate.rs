//! Input checks shared by the mutation services.

use crate::model::{KeyResultDraft, KeyResultPatch, LogDraft, ObjectiveDraft, ObjectivePatch};
use crate::progress::parse_deadline;

use super::{CoreError, CoreResult};

pub fn title(field: &'static str, value: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(field, "cannot be empty"));
    }
    if value.contains('\0') {
        return Err(CoreError::validation(field, "contains a NUL character"));
    }
    Ok(())
}

pub fn deadline(value: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::validation("deadline", "cannot be empty"));
    }
    if parse_deadline(value).is_none() {
        return Err(CoreError::validation(
            "deadline",
            format!("expected YYYY-MM-DD, got '{value}'"),
        ));
    }
    Ok(())
}

pub fn target(value: f64) -> CoreResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CoreError::validation(
            "target",
            format!("must be a positive number, got {value}"),
        ));
    }
    Ok(())
}

pub fn finite(field: &'static str, value: f64) -> CoreResult<()> {
    if !value.is_finite() {
        return Err(CoreError::validation(field, "must be a finite number"));
    }
    Ok(())
}

pub fn key_result_draft(draft: &KeyResultDraft) -> CoreResult<()> {
    title("key result title", &draft.title)?;
    target(draft.target)?;
    finite("current", draft.current)
}

pub fn key_result_patch(patch: &KeyResultPatch) -> CoreResult<()> {
    if let Some(t) = &patch.title {
        title("key result title", t)?;
    }
    if let Some(t) = patch.target {
        target(t)?;
    }
    if let Some(c) = patch.current {
        finite("current", c)?;
    }
    Ok(())
}

pub fn objective_draft(draft: &ObjectiveDraft) -> CoreResult<()> {
    title("title", &draft.title)?;
    deadline(&draft.deadline)?;
    draft.key_results.iter().try_for_each(key_result_draft)
}

/// Key results in a patch are not re-checked: they come from stored
/// documents, which may predate these rules.
pub fn objective_patch(patch: &ObjectivePatch) -> CoreResult<()> {
    if let Some(t) = &patch.title {
        title("title", t)?;
    }
    if let Some(d) = &patch.deadline {
        deadline(d)?;
    }
    Ok(())
}

pub fn log_draft(draft: &LogDraft) -> CoreResult<()> {
    title("content", &draft.content)?;
    finite("progress delta", draft.progress_delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Quarter};

    fn draft() -> ObjectiveDraft {
        ObjectiveDraft {
            title: "Ship v2".to_string(),
            quarter: Quarter::Q3,
            deadline: "2026-09-30".to_string(),
            category: Category::Work,
            key_results: vec![KeyResultDraft::new("Close bugs", 10.0)],
        }
    }

    #[test]
    fn test_valid_objective_draft() {
        objective_draft(&draft()).unwrap();
    }

    #[test]
    fn test_blank_title_rejected() {
        let mut d = draft();
        d.title = "   ".to_string();
        let err = objective_draft(&d).unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "title", .. }));
    }

    #[test]
    fn test_unparseable_deadline_rejected() {
        let mut d = draft();
        d.deadline = "next tuesday".to_string();
        let err = objective_draft(&d).unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "deadline", .. }));
    }

    #[test]
    fn test_key_result_target_must_be_positive() {
        for bad in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let kr = KeyResultDraft::new("x", bad);
            assert!(key_result_draft(&kr).is_err(), "target {bad} accepted");
        }
    }

    #[test]
    fn test_patch_checks_only_present_fields() {
        objective_patch(&ObjectivePatch::default()).unwrap();
        let patch = ObjectivePatch {
            deadline: Some("2026-13-40".to_string()),
            ..ObjectivePatch::default()
        };
        assert!(objective_patch(&patch).is_err());
        let kr = KeyResultPatch {
            current: Some(f64::NAN),
            ..KeyResultPatch::default()
        };
        assert!(key_result_patch(&kr).is_err());
    }

    #[test]
    fn test_log_content_required() {
        let log = LogDraft::default();
        assert!(matches!(
            log_draft(&log).unwrap_err(),
            CoreError::Validation { field: "content", .. }
        ));
    }
}
