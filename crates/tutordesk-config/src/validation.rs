// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as the issue key format, positive durations, and
//! well-formed shift windows.

use std::sync::LazyLock;

use regex::Regex;

use crate::diagnostic::ConfigError;
use crate::model::TutorDeskConfig;

/// Upper bound for configured intervals. Timestamps shifted by a window or
/// an SLA must stay inside chrono's representable range.
pub const MAX_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

static QUEUE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("static regex"));

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &TutorDeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let queue_key = config.tracker.queue_key.trim();
    if queue_key.is_empty() {
        fail("tracker.queue_key must not be empty".to_string());
    } else if !QUEUE_KEY_RE.is_match(queue_key) {
        fail(format!(
            "tracker.queue_key `{queue_key}` must be upper-case letters, digits or `_`"
        ));
    }

    for (key, secs) in [
        ("grouping.time_frame_secs", config.grouping.time_frame_secs),
        ("escalation.response_sla_secs", config.escalation.response_sla_secs),
        ("escalation.period_secs", config.escalation.period_secs),
    ] {
        if secs == 0 {
            fail(format!("{key} must be positive"));
        } else if secs > MAX_INTERVAL_SECS {
            fail(format!(
                "{key} must be at most {MAX_INTERVAL_SECS} (one year), got {secs}"
            ));
        }
    }
    // chrono::FixedOffset accepts strictly less than one day.
    if config.escalation.utc_offset_minutes.unsigned_abs() >= 24 * 60 {
        fail(format!(
            "escalation.utc_offset_minutes must be within ±1439, got {}",
            config.escalation.utc_offset_minutes
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.roles.courses.iter().any(|c| c.trim().is_empty()) {
        fail("roles.courses must not contain empty names".to_string());
    }

    for (i, shift) in config.escalation.shifts.iter().enumerate() {
        if !config.roles.courses.contains(&shift.course) {
            errors.push(ConfigError::shift(
                i,
                "course",
                format!("`{}` is not listed in roles.courses", shift.course),
            ));
        }
        if let Err(e) = shift.weekdays() {
            errors.push(ConfigError::shift(i, "days", e));
        }
        let start = shift.start_time();
        let end = shift.end_time();
        if let Err(e) = &start {
            errors.push(ConfigError::shift(i, "start", e.clone()));
        }
        if let Err(e) = &end {
            errors.push(ConfigError::shift(i, "end", e.clone()));
        }
        if let (Ok(start), Ok(end)) = (start, end)
            && start == end
        {
            errors.push(ConfigError::shift(
                i,
                "end",
                format!("empty window ({} to {})", shift.start, shift.end),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShiftConfig;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    fn shift_fields(errors: &[ConfigError]) -> Vec<(usize, &'static str)> {
        errors
            .iter()
            .filter_map(|e| match e {
                ConfigError::InvalidShift { index, field, .. } => Some((*index, *field)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn default_config_validates() {
        let config = TutorDeskConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn lowercase_queue_key_fails_validation() {
        let mut config = TutorDeskConfig::default();
        config.tracker.queue_key = "backlog".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "tracker.queue_key"));
    }

    #[test]
    fn zero_durations_fail_validation() {
        let mut config = TutorDeskConfig::default();
        config.grouping.time_frame_secs = 0;
        config.escalation.response_sla_secs = 0;
        config.escalation.period_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(has_error(&errors, "time_frame_secs"));
        assert!(has_error(&errors, "response_sla_secs"));
        assert!(has_error(&errors, "period_secs"));
    }

    #[test]
    fn shift_errors_are_all_collected() {
        let mut config = TutorDeskConfig::default();
        config.escalation.shifts.push(ShiftConfig {
            course: "Unknown".into(),
            days: vec!["caturday".into()],
            start: "9am".into(),
            end: "18:00".into(),
        });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            shift_fields(&errors),
            vec![(0, "course"), (0, "days"), (0, "start")]
        );
        assert!(errors.iter().any(|e| e.to_string().contains("caturday")));
    }

    #[test]
    fn intervals_beyond_a_year_fail_validation() {
        let mut config = TutorDeskConfig::default();
        config.grouping.time_frame_secs = 9_000_000_000_000;
        config.escalation.response_sla_secs = MAX_INTERVAL_SECS + 1;
        config.escalation.period_secs = MAX_INTERVAL_SECS;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(has_error(&errors, "grouping.time_frame_secs must be at most"));
        assert!(has_error(&errors, "escalation.response_sla_secs must be at most"));
    }

    #[test]
    fn extreme_utc_offset_is_rejected_without_overflow() {
        let mut config = TutorDeskConfig::default();
        config.escalation.utc_offset_minutes = i32::MIN;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "utc_offset_minutes"));

        config.escalation.utc_offset_minutes = -1439;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn overnight_shift_is_accepted() {
        let mut config = TutorDeskConfig::default();
        config.escalation.shifts.push(ShiftConfig {
            course: "HardDE".into(),
            days: vec!["fri".into()],
            start: "22:00".into(),
            end: "02:00".into(),
        });
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_shift_window_fails_validation() {
        let mut config = TutorDeskConfig::default();
        config.escalation.shifts.push(ShiftConfig {
            course: "StartDE".into(),
            days: vec![],
            start: "10:00".into(),
            end: "10:00".into(),
        });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(shift_fields(&errors), vec![(0, "end")]);
        assert!(errors[0].to_string().contains("empty window"));
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = TutorDeskConfig::default();
        config.storage.database_path = " ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "database_path"));
    }
}
