// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for TutorDesk.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Top-level TutorDesk configuration.
///
/// Loaded once at process start and passed by reference into every
/// component. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TutorDeskConfig {
    /// Process-wide settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Pachca chat platform API settings.
    #[serde(default)]
    pub pachca: PachcaConfig,

    /// Telegram escalation channel settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Issue tracker integration settings.
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Webhook gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Role classification settings.
    #[serde(default)]
    pub roles: RolesConfig,

    /// Message grouping settings.
    #[serde(default)]
    pub grouping: GroupingConfig,

    /// SLA escalation settings.
    #[serde(default)]
    pub escalation: EscalationConfig,
}

/// Process-wide configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Pachca API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PachcaConfig {
    /// Base URL of the Pachca shared API.
    #[serde(default = "default_pachca_api_url")]
    pub api_url: String,

    /// Bot access token. Required to serve webhooks.
    #[serde(default)]
    pub token: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PachcaConfig {
    fn default() -> Self {
        Self {
            api_url: default_pachca_api_url(),
            token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_pachca_api_url() -> String {
    "https://api.pachca.com/api/shared/v1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Telegram escalation channel configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. `None` disables escalation delivery.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Chat that receives escalation digests.
    #[serde(default)]
    pub escalation_chat_id: Option<i64>,
}

/// Issue tracker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TrackerConfig {
    /// Queue key prefix of issue keys, e.g. `BACKLOG` for `BACKLOG-12`.
    #[serde(default = "default_queue_key")]
    pub queue_key: String,

    /// Statuses that trigger subscriber notifications. Empty tracks all.
    #[serde(default = "default_tracked_statuses")]
    pub tracked_statuses: Vec<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            queue_key: default_queue_key(),
            tracked_statuses: default_tracked_statuses(),
        }
    }
}

fn default_queue_key() -> String {
    "BACKLOG".to_string()
}

fn default_tracked_statuses() -> Vec<String> {
    vec!["Закрыт".to_string()]
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("tutordesk").join("tutordesk.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("tutordesk.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Webhook gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Address to bind the HTTP server to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind the HTTP server to.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Role classification configuration.
///
/// Students carry a `<Course>_<digits>` tag for one of `courses`; staff carry
/// one of the literal expert or curator tags.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RolesConfig {
    /// Course name literals recognized in student tags.
    #[serde(default = "default_courses")]
    pub courses: Vec<String>,

    /// Tags that mark a user as an expert.
    #[serde(default = "default_expert_tags")]
    pub expert_tags: Vec<String>,

    /// Tags that mark a user as a curator.
    #[serde(default = "default_curator_tags")]
    pub curator_tags: Vec<String>,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            courses: default_courses(),
            expert_tags: default_expert_tags(),
            curator_tags: default_curator_tags(),
        }
    }
}

fn default_courses() -> Vec<String> {
    vec!["HardDE".to_string(), "StartDE".to_string()]
}

fn default_expert_tags() -> Vec<String> {
    vec!["expert".to_string()]
}

fn default_curator_tags() -> Vec<String> {
    vec!["curator".to_string()]
}

/// Message grouping configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GroupingConfig {
    /// Maximum gap in seconds between two messages of the same question.
    #[serde(default = "default_time_frame_secs")]
    pub time_frame_secs: u64,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            time_frame_secs: default_time_frame_secs(),
        }
    }
}

fn default_time_frame_secs() -> u64 {
    60 * 60
}

/// SLA escalation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EscalationConfig {
    /// Seconds a question may stay unanswered before it is escalated.
    #[serde(default = "default_response_sla_secs")]
    pub response_sla_secs: u64,

    /// Seconds between two escalation scans.
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,

    /// Seconds to wait before retrying after a failed scan.
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,

    /// Offset from UTC, in minutes, of the timezone shift windows are written in.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,

    /// Per-course windows during which escalations may be sent.
    /// A course without any window is escalated around the clock.
    #[serde(default)]
    pub shifts: Vec<ShiftConfig>,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            response_sla_secs: default_response_sla_secs(),
            period_secs: default_period_secs(),
            retry_backoff_secs: default_retry_backoff_secs(),
            utc_offset_minutes: default_utc_offset_minutes(),
            shifts: Vec::new(),
        }
    }
}

fn default_response_sla_secs() -> u64 {
    55 * 60
}

fn default_period_secs() -> u64 {
    10 * 60
}

fn default_retry_backoff_secs() -> u64 {
    10
}

fn default_utc_offset_minutes() -> i32 {
    3 * 60
}

/// One shift window of a course.
///
/// `start` and `end` are `HH:MM` in the escalation timezone. When `end` is
/// earlier than `start` the window runs overnight into the next day.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ShiftConfig {
    pub course: String,

    /// Weekday names (`mon`, `Tuesday`, ...). Empty means every day.
    #[serde(default)]
    pub days: Vec<String>,

    pub start: String,
    pub end: String,
}

impl ShiftConfig {
    /// Parse `days` into weekdays, rejecting unknown names.
    pub fn weekdays(&self) -> Result<Vec<Weekday>, String> {
        if self.days.is_empty() {
            return Ok(vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ]);
        }
        self.days
            .iter()
            .map(|d| {
                d.trim()
                    .parse::<Weekday>()
                    .map_err(|_| format!("unknown weekday `{d}`"))
            })
            .collect()
    }

    pub fn start_time(&self) -> Result<NaiveTime, String> {
        parse_clock(&self.start)
    }

    pub fn end_time(&self) -> Result<NaiveTime, String> {
        parse_clock(&self.end)
    }
}

fn parse_clock(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| format!("`{value}` is not a valid HH:MM time"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift(days: &[&str], start: &str, end: &str) -> ShiftConfig {
        ShiftConfig {
            course: "HardDE".into(),
            days: days.iter().map(|d| d.to_string()).collect(),
            start: start.into(),
            end: end.into(),
        }
    }

    #[test]
    fn weekdays_accept_short_and_long_names() {
        let s = shift(&["mon", "Tuesday", " sun "], "09:00", "18:00");
        assert_eq!(
            s.weekdays().unwrap(),
            vec![Weekday::Mon, Weekday::Tue, Weekday::Sun]
        );
    }

    #[test]
    fn empty_days_mean_every_day() {
        let s = shift(&[], "09:00", "18:00");
        assert_eq!(s.weekdays().unwrap().len(), 7);
    }

    #[test]
    fn unknown_weekday_is_rejected() {
        let s = shift(&["funday"], "09:00", "18:00");
        assert!(s.weekdays().unwrap_err().contains("funday"));
    }

    #[test]
    fn clock_parsing() {
        let s = shift(&[], "09:30", "25:00");
        assert_eq!(
            s.start_time().unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert!(s.end_time().is_err());
    }
}
