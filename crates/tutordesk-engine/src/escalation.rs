// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SLA escalation poller.
//!
//! Every `period` the poller scans for pending questions older than the
//! response SLA, keeps the earliest message of each group, splits the
//! groups by course, drops courses whose shift window is closed, and sends
//! one digest per remaining course to the escalation channel. A failed scan
//! is retried after `retry_backoff`. Cancellation is observed between
//! cycles only; a running cycle always completes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tutordesk_config::model::EscalationConfig;
use tutordesk_core::{EscalationSink, GroupId, MessageStore, StudentMessage, TutorDeskError};

use crate::fanout::fan_out;
use crate::shift::ShiftPolicy;
use crate::texts;

/// Observable poller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Scanning,
}

/// Summary of one escalation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Distinct pending groups past the SLA.
    pub overdue_groups: usize,
    /// Courses whose digest was sent successfully.
    pub delivered: Vec<Option<String>>,
    /// Courses skipped because their shift window was closed.
    pub suppressed: Vec<Option<String>>,
    /// Courses whose digest could not be sent.
    pub failed: Vec<Option<String>>,
}

pub struct EscalationPoller {
    store: Arc<dyn MessageStore>,
    sink: Arc<dyn EscalationSink>,
    channel_id: i64,
    policy: ShiftPolicy,
    response_sla: chrono::Duration,
    period: Duration,
    retry_backoff: Duration,
    scanning: AtomicBool,
}

impl EscalationPoller {
    pub fn new(
        store: Arc<dyn MessageStore>,
        sink: Arc<dyn EscalationSink>,
        channel_id: i64,
        config: &EscalationConfig,
    ) -> Result<Self, TutorDeskError> {
        let response_sla = chrono::Duration::from_std(Duration::from_secs(config.response_sla_secs))
            .map_err(|e| TutorDeskError::Config(format!("escalation.response_sla_secs: {e}")))?;
        Ok(Self {
            store,
            sink,
            channel_id,
            policy: ShiftPolicy::from_config(config)?,
            response_sla,
            period: Duration::from_secs(config.period_secs),
            retry_backoff: Duration::from_secs(config.retry_backoff_secs),
            scanning: AtomicBool::new(false),
        })
    }

    pub fn state(&self) -> PollerState {
        if self.scanning.load(Ordering::Acquire) {
            PollerState::Scanning
        } else {
            PollerState::Idle
        }
    }

    /// Run one escalation cycle as of `check_time`.
    ///
    /// Only the store read can fail the cycle; send failures are reported.
    pub async fn run_cycle(&self, check_time: DateTime<Utc>) -> Result<CycleReport, TutorDeskError> {
        self.scanning.store(true, Ordering::Release);
        let result = self.scan(check_time).await;
        self.scanning.store(false, Ordering::Release);
        result
    }

    async fn scan(&self, check_time: DateTime<Utc>) -> Result<CycleReport, TutorDeskError> {
        let cutoff = check_time.checked_sub_signed(self.response_sla).ok_or_else(|| {
            TutorDeskError::Config(format!(
                "response SLA of {}s reaches before {check_time}",
                self.response_sla.num_seconds()
            ))
        })?;
        let overdue = self.store.pending_sent_before(cutoff).await?;
        if overdue.is_empty() {
            info!("no pending questions with violated SLA");
            return Ok(CycleReport::default());
        }

        let representatives = earliest_per_group(overdue);
        info!(groups = representatives.len(), "pending message groups past SLA");

        let mut report = CycleReport {
            overdue_groups: representatives.len(),
            ..CycleReport::default()
        };

        let mut digests = Vec::new();
        for (course, mut messages) in by_course(representatives) {
            if !self.policy.is_open(course.as_deref(), check_time) {
                debug!(course = ?course, "shift window closed, escalation suppressed");
                report.suppressed.push(course);
                continue;
            }
            messages.sort_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then(a.message_id.cmp(&b.message_id))
            });
            let text = texts::escalation_digest(course.as_deref(), &messages);
            digests.push((course, text));
        }

        let deliveries = fan_out(digests, |(_, text)| {
            let sink = self.sink.clone();
            let text = text.clone();
            let channel_id = self.channel_id;
            async move { sink.send(channel_id, &text).await }
        })
        .await;

        for d in deliveries {
            let (course, _) = d.target;
            match d.result {
                Ok(()) => report.delivered.push(course),
                Err(e) => {
                    warn!(course = ?course, error = %e, "escalation digest failed");
                    report.failed.push(course);
                }
            }
        }

        if !report.failed.is_empty() {
            let total = report.failed.len() + report.delivered.len();
            warn!(failed = report.failed.len(), total, "some escalation digests failed");
        }
        Ok(report)
    }

    /// Poll until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            period_secs = self.period.as_secs(),
            sla_secs = self.response_sla.num_seconds(),
            "escalation poller started"
        );
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let wait = match self.run_cycle(Utc::now()).await {
                Ok(report) => {
                    debug!(?report, "escalation cycle complete");
                    self.period
                }
                Err(e) => {
                    error!(error = %e, "escalation cycle failed, retrying after backoff");
                    self.retry_backoff
                }
            };
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }
        info!("escalation poller stopped");
    }

    /// Spawn the poll loop as a background task.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}

/// Keep the earliest-created message of every group.
fn earliest_per_group(messages: Vec<StudentMessage>) -> Vec<StudentMessage> {
    let mut groups: HashMap<GroupId, StudentMessage> = HashMap::new();
    for message in messages {
        match groups.get(&message.message_group_id) {
            Some(current) if current.created_at <= message.created_at => {}
            _ => {
                groups.insert(message.message_group_id.clone(), message);
            }
        }
    }
    groups.into_values().collect()
}

/// Partition by course; courseless messages share the `None` bucket.
fn by_course(messages: Vec<StudentMessage>) -> BTreeMap<Option<String>, Vec<StudentMessage>> {
    let mut courses: BTreeMap<Option<String>, Vec<StudentMessage>> = BTreeMap::new();
    for message in messages {
        courses.entry(message.course.clone()).or_default().push(message);
    }
    courses
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tutordesk_config::model::ShiftConfig;
    use tutordesk_core::types::{GroupLookup, NewStudentMessage};
    use tutordesk_test_utils::{FlakyStore, MockEscalationSink, temp_storage};

    const CHANNEL: i64 = -1001;

    fn t0() -> DateTime<Utc> {
        // Wednesday 12:00 UTC, 15:00 at UTC+3.
        Utc.with_ymd_and_hms(2025, 5, 7, 12, 0, 0).unwrap()
    }

    fn sla_config(sla_secs: u64) -> EscalationConfig {
        EscalationConfig {
            response_sla_secs: sla_secs,
            ..EscalationConfig::default()
        }
    }

    async fn seed(
        store: &dyn MessageStore,
        id: i64,
        group: &str,
        chat: i64,
        secs: i64,
        course: Option<&str>,
    ) {
        let at = t0() + chrono::Duration::seconds(secs);
        let msg = NewStudentMessage {
            message_id: id,
            user_id: id,
            chat_id: chat,
            thread_message_id: None,
            thread_chat_id: None,
            text: String::new(),
            sent_at: at,
            course: course.map(str::to_string),
            created_at: at,
        };
        // A lookup that never matches forces the given group id.
        let lookup = GroupLookup {
            user_id: -1,
            chat_id: -1,
            thread_message_id: None,
            window_start: at,
            window_end: at,
        };
        store
            .record_student_message(msg, lookup, GroupId(group.into()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn escalates_only_after_sla() {
        let (storage, _dir) = temp_storage().await;
        let sink = Arc::new(MockEscalationSink::new());
        seed(&*storage, 1, "g1", 10, 0, None).await;
        let poller = EscalationPoller::new(storage.clone(), sink.clone(), CHANNEL, &sla_config(100))
            .unwrap();

        let early = poller.run_cycle(t0() + chrono::Duration::seconds(99)).await.unwrap();
        assert_eq!(early, CycleReport::default());
        assert_eq!(sink.sent_count().await, 0);

        let late = poller.run_cycle(t0() + chrono::Duration::seconds(101)).await.unwrap();
        assert_eq!(late.overdue_groups, 1);
        let sent = sink.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, CHANNEL);
        assert!(sent[0].1.contains("https://app.pachca.com/chats/10?message=1"));
    }

    #[tokio::test]
    async fn oversized_sla_fails_the_cycle_without_sending() {
        let (storage, _dir) = temp_storage().await;
        let sink = Arc::new(MockEscalationSink::new());
        seed(&*storage, 1, "g1", 10, 0, None).await;
        let poller = EscalationPoller::new(
            storage.clone(),
            sink.clone(),
            CHANNEL,
            &sla_config(9_000_000_000_000),
        )
        .unwrap();

        let err = poller.run_cycle(t0()).await.unwrap_err();
        assert!(matches!(err, TutorDeskError::Config(_)));
        assert_eq!(poller.state(), PollerState::Idle);
        assert_eq!(sink.sent_count().await, 0);
    }

    #[tokio::test]
    async fn one_link_per_group_using_earliest_message() {
        let (storage, _dir) = temp_storage().await;
        let sink = Arc::new(MockEscalationSink::new());
        seed(&*storage, 2, "g1", 10, 5, Some("HardDE")).await;
        seed(&*storage, 1, "g1", 10, 0, Some("HardDE")).await;
        seed(&*storage, 3, "g2", 11, 1, Some("HardDE")).await;
        let poller = EscalationPoller::new(storage.clone(), sink.clone(), CHANNEL, &sla_config(10))
            .unwrap();

        let report = poller.run_cycle(t0() + chrono::Duration::seconds(60)).await.unwrap();
        assert_eq!(report.overdue_groups, 2);
        assert_eq!(report.delivered, vec![Some("HardDE".to_string())]);

        let sent = sink.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].1,
            "#HardDE: сообщения ожидающие реакции:\n\n\
             https://app.pachca.com/chats/10?message=1\n\n\
             https://app.pachca.com/chats/11?message=3"
        );
    }

    #[tokio::test]
    async fn courses_get_separate_digests() {
        let (storage, _dir) = temp_storage().await;
        let sink = Arc::new(MockEscalationSink::new());
        seed(&*storage, 1, "g1", 10, 0, Some("HardDE")).await;
        seed(&*storage, 2, "g2", 11, 0, Some("StartDE")).await;
        seed(&*storage, 3, "g3", 12, 0, None).await;
        let poller = EscalationPoller::new(storage.clone(), sink.clone(), CHANNEL, &sla_config(10))
            .unwrap();

        let report = poller.run_cycle(t0() + chrono::Duration::seconds(60)).await.unwrap();
        assert_eq!(report.delivered.len(), 3);
        let texts: Vec<String> = sink.sent_messages().await.into_iter().map(|(_, t)| t).collect();
        assert!(texts.iter().any(|t| t.starts_with("#HardDE:")));
        assert!(texts.iter().any(|t| t.starts_with("#StartDE:")));
        assert!(texts.iter().any(|t| t.starts_with("Сообщения ожидающие реакции:")));
    }

    #[tokio::test]
    async fn closed_shift_suppresses_course_for_this_cycle() {
        let (storage, _dir) = temp_storage().await;
        let sink = Arc::new(MockEscalationSink::new());
        seed(&*storage, 1, "g1", 10, 0, Some("HardDE")).await;
        seed(&*storage, 2, "g2", 11, 0, Some("StartDE")).await;
        let config = EscalationConfig {
            response_sla_secs: 10,
            utc_offset_minutes: 180,
            shifts: vec![ShiftConfig {
                course: "HardDE".into(),
                days: vec!["wed".into()],
                start: "09:00".into(),
                end: "15:00".into(),
            }],
            ..EscalationConfig::default()
        };
        let poller = EscalationPoller::new(storage.clone(), sink.clone(), CHANNEL, &config).unwrap();

        // 15:01 local: HardDE shift is over.
        let report = poller.run_cycle(t0() + chrono::Duration::seconds(60)).await.unwrap();
        assert_eq!(report.suppressed, vec![Some("HardDE".to_string())]);
        assert_eq!(report.delivered, vec![Some("StartDE".to_string())]);

        // The group stays pending and is escalated once the window reopens.
        let next_week = t0() + chrono::Duration::days(7) - chrono::Duration::hours(2);
        let report = poller.run_cycle(next_week).await.unwrap();
        assert!(report.delivered.contains(&Some("HardDE".to_string())));
    }

    #[tokio::test]
    async fn resolved_groups_are_not_escalated() {
        let (storage, _dir) = temp_storage().await;
        let sink = Arc::new(MockEscalationSink::new());
        seed(&*storage, 1, "g1", 10, 0, None).await;
        storage
            .resolve_group(
                1,
                tutordesk_core::types::Resolution {
                    resolved_at: t0(),
                    reaction_message_id: None,
                },
            )
            .await
            .unwrap();
        let poller = EscalationPoller::new(storage.clone(), sink.clone(), CHANNEL, &sla_config(10))
            .unwrap();

        poller.run_cycle(t0() + chrono::Duration::seconds(60)).await.unwrap();
        assert_eq!(sink.sent_count().await, 0);
    }

    #[tokio::test]
    async fn failed_digest_does_not_fail_cycle() {
        let (storage, _dir) = temp_storage().await;
        let sink = Arc::new(MockEscalationSink::new());
        sink.fail_when_contains("#HardDE").await;
        seed(&*storage, 1, "g1", 10, 0, Some("HardDE")).await;
        seed(&*storage, 2, "g2", 11, 0, Some("StartDE")).await;
        let poller = EscalationPoller::new(storage.clone(), sink.clone(), CHANNEL, &sla_config(10))
            .unwrap();

        let report = poller.run_cycle(t0() + chrono::Duration::seconds(60)).await.unwrap();
        assert_eq!(report.failed, vec![Some("HardDE".to_string())]);
        assert_eq!(report.delivered, vec![Some("StartDE".to_string())]);
        assert_eq!(sink.sent_count().await, 1);
    }

    #[tokio::test]
    async fn store_failure_fails_cycle() {
        let (storage, _dir) = temp_storage().await;
        let flaky = Arc::new(FlakyStore::new(storage));
        flaky.fail_messages(true);
        let sink = Arc::new(MockEscalationSink::new());
        let poller = EscalationPoller::new(flaky, sink, CHANNEL, &sla_config(10)).unwrap();

        let err = poller.run_cycle(t0()).await.unwrap_err();
        assert!(err.is_storage());
        assert_eq!(poller.state(), PollerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_retries_after_backoff_and_stops_on_cancel() {
        let (storage, _dir) = temp_storage().await;
        let flaky = Arc::new(FlakyStore::new(storage));
        flaky.fail_messages(true);
        let sink = Arc::new(MockEscalationSink::new());
        let config = EscalationConfig {
            period_secs: 600,
            retry_backoff_secs: 10,
            ..EscalationConfig::default()
        };
        let poller =
            Arc::new(EscalationPoller::new(flaky.clone(), sink, CHANNEL, &config).unwrap());

        let cancel = CancellationToken::new();
        let handle = poller.clone().spawn(cancel.clone());

        tokio::time::sleep(Duration::from_secs(25)).await;
        // First attempt at t=0, retries at t=10 and t=20.
        assert_eq!(flaky.message_calls(), 3);

        flaky.fail_messages(false);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(flaky.message_calls(), 4);

        // The healthy cycle switches to the regular period.
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(flaky.message_calls(), 4);

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(poller.state(), PollerState::Idle);
    }
}
