// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-course notification windows.
//!
//! Each course may list shift windows (weekday set and a time-of-day range)
//! in a fixed UTC offset. Escalations for a course are only sent while one of
//! its windows is open. A course without windows, and messages without a
//! course, are always open.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, NaiveTime, Utc, Weekday};
use tutordesk_config::model::EscalationConfig;
use tutordesk_core::TutorDeskError;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ShiftWindow {
    days: Vec<Weekday>,
    start: NaiveTime,
    end: NaiveTime,
}

impl ShiftWindow {
    /// `end <= start` means the window runs past midnight; the part after
    /// midnight belongs to the weekday the shift started on.
    fn contains(&self, local: NaiveDateTime) -> bool {
        let day = local.weekday();
        let time = local.time();
        if self.start < self.end {
            self.days.contains(&day) && self.start <= time && time < self.end
        } else {
            (self.days.contains(&day) && time >= self.start)
                || (self.days.contains(&day.pred()) && time < self.end)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShiftPolicy {
    offset: FixedOffset,
    windows: HashMap<String, Vec<ShiftWindow>>,
}

impl ShiftPolicy {
    pub fn from_config(config: &EscalationConfig) -> Result<Self, TutorDeskError> {
        let offset = config
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                TutorDeskError::Config(format!(
                    "utc_offset_minutes {} is out of range",
                    config.utc_offset_minutes
                ))
            })?;

        let mut windows: HashMap<String, Vec<ShiftWindow>> = HashMap::new();
        for shift in &config.shifts {
            let window = ShiftWindow {
                days: shift.weekdays().map_err(TutorDeskError::Config)?,
                start: shift.start_time().map_err(TutorDeskError::Config)?,
                end: shift.end_time().map_err(TutorDeskError::Config)?,
            };
            windows.entry(shift.course.clone()).or_default().push(window);
        }
        Ok(Self { offset, windows })
    }

    pub fn is_open(&self, course: Option<&str>, at: DateTime<Utc>) -> bool {
        let Some(windows) = course.and_then(|c| self.windows.get(c)) else {
            return true;
        };
        let local = at.with_timezone(&self.offset).naive_local();
        windows.iter().any(|w| w.contains(local))
    }
}
