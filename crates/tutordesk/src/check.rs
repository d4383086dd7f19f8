// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tutordesk check`: one escalation cycle from the command line.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;
use tutordesk_config::TutorDeskConfig;
use tutordesk_core::{
    AdapterType, EscalationSink, HealthStatus, PluginAdapter, StorageAdapter, TutorDeskError,
};
use tutordesk_engine::{CycleReport, EscalationPoller};
use tutordesk_storage::SqliteStorage;
use tutordesk_telegram::TelegramEscalation;

/// Escalation sink that prints digests to stdout.
struct StdoutEscalation;

#[async_trait]
impl PluginAdapter for StdoutEscalation {
    fn name(&self) -> &str {
        "stdout"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Escalation
    }

    async fn health_check(&self) -> Result<HealthStatus, TutorDeskError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EscalationSink for StdoutEscalation {
    async fn send(&self, channel_id: i64, text: &str) -> Result<(), TutorDeskError> {
        println!("--- escalation to {channel_id} ---\n{text}\n");
        Ok(())
    }
}

/// Runs the `tutordesk check` command.
pub async fn run_check(
    config: TutorDeskConfig,
    at: Option<DateTime<Utc>>,
    dry_run: bool,
) -> Result<(), TutorDeskError> {
    crate::init_tracing(&config.service.log_level);

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;

    let channel_id = config.telegram.escalation_chat_id.unwrap_or_default();
    let sink: Arc<dyn EscalationSink> = if dry_run {
        Arc::new(StdoutEscalation)
    } else {
        let channel_configured = config.telegram.escalation_chat_id.is_some();
        if !channel_configured {
            return Err(TutorDeskError::Config(
                "telegram.escalation_chat_id is required (or pass --dry-run)".into(),
            ));
        }
        Arc::new(TelegramEscalation::new(&config.telegram)?)
    };

    let poller = EscalationPoller::new(storage.clone(), sink, channel_id, &config.escalation)?;
    let check_time = at.unwrap_or_else(Utc::now);
    info!(%check_time, dry_run, "running one escalation cycle");
    let report = poller.run_cycle(check_time).await;

    storage.close().await?;
    print_report(&report?);
    Ok(())
}

fn print_report(report: &CycleReport) {
    let label = |course: &Option<String>| course.clone().unwrap_or_else(|| "(no course)".into());
    println!("overdue groups: {}", report.overdue_groups);
    for course in &report.delivered {
        println!("  sent       {}", label(course));
    }
    for course in &report.suppressed {
        println!("  off-shift  {}", label(course));
    }
    for course in &report.failed {
        println!("  failed     {}", label(course));
    }
}
