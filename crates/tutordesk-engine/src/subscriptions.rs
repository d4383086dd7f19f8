// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket subscriptions: chat threads waiting for tracker status changes.
//!
//! Subscribe and unsubscribe couple the store write with the chat
//! acknowledgement. If the write fails nothing is sent; if the
//! acknowledgement fails the write is undone with a compensating write and
//! the error is returned.

use std::sync::Arc;

use chrono::Utc;
use regex::Regex;
use tracing::{debug, error, info, warn};
use tutordesk_config::model::TrackerConfig;
use tutordesk_core::events::{ChatMessageEvent, TicketStatusEvent};
use tutordesk_core::{ChatSink, SubscriptionStore, ThreadSubscription, TutorDeskError};

use crate::fanout::{FanoutReport, fan_out};
use crate::texts;

/// What a subscribe or unsubscribe command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Subscribed(String),
    AlreadySubscribed(String),
    Unsubscribed(String),
    NotSubscribed(String),
    /// The command text carried no issue key of the tracked queue.
    NoIssueKey,
}

pub struct SubscriptionRegistry {
    store: Arc<dyn SubscriptionStore>,
    chat: Arc<dyn ChatSink>,
    issue_key: Regex,
    tracked_statuses: Vec<String>,
}

impl SubscriptionRegistry {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        chat: Arc<dyn ChatSink>,
        config: &TrackerConfig,
    ) -> Result<Self, TutorDeskError> {
        let pattern = format!(r"{}-\d+", regex::escape(config.queue_key.trim()));
        let issue_key = Regex::new(&pattern)
            .map_err(|e| TutorDeskError::Config(format!("tracker.queue_key: {e}")))?;
        Ok(Self {
            store,
            chat,
            issue_key,
            tracked_statuses: config.tracked_statuses.clone(),
        })
    }

    /// First issue key of the tracked queue mentioned in `text`.
    pub fn extract_issue_key<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.issue_key.find(text).map(|m| m.as_str())
    }

    pub async fn subscribe(
        &self,
        message: &ChatMessageEvent,
    ) -> Result<CommandOutcome, TutorDeskError> {
        let Some(key) = self.extract_issue_key(&message.content) else {
            info!(message_id = message.id, "subscribe command without issue key");
            return Ok(CommandOutcome::NoIssueKey);
        };

        if self.store.find_subscription(key, message.chat_id).await?.is_some() {
            self.reply(message, &texts::already_subscribed(key)).await?;
            return Ok(CommandOutcome::AlreadySubscribed(key.to_string()));
        }

        let sub = ThreadSubscription {
            issue_key: key.to_string(),
            chat_id: message.chat_id,
            message_id: message.id,
            created_at: Utc::now(),
        };
        if !self.store.insert_subscription(&sub).await? {
            // Lost a race against a concurrent subscribe for the same pair.
            self.reply(message, &texts::already_subscribed(key)).await?;
            return Ok(CommandOutcome::AlreadySubscribed(key.to_string()));
        }

        if let Err(e) = self.reply(message, &texts::subscribed(key)).await {
            warn!(issue_key = key, chat_id = message.chat_id, error = %e, "subscribe ack failed, rolling back");
            if let Err(undo) = self.store.delete_subscription(key, message.chat_id).await {
                error!(issue_key = key, chat_id = message.chat_id, error = %undo, "subscribe rollback failed");
            }
            return Err(e);
        }

        info!(issue_key = key, chat_id = message.chat_id, "thread subscribed");
        Ok(CommandOutcome::Subscribed(key.to_string()))
    }

    pub async fn unsubscribe(
        &self,
        message: &ChatMessageEvent,
    ) -> Result<CommandOutcome, TutorDeskError> {
        let Some(key) = self.extract_issue_key(&message.content) else {
            info!(message_id = message.id, "unsubscribe command without issue key");
            return Ok(CommandOutcome::NoIssueKey);
        };

        let Some(removed) = self.store.delete_subscription(key, message.chat_id).await? else {
            self.reply(message, &texts::not_subscribed(key)).await?;
            return Ok(CommandOutcome::NotSubscribed(key.to_string()));
        };

        if let Err(e) = self.reply(message, &texts::unsubscribed(key)).await {
            warn!(issue_key = key, chat_id = message.chat_id, error = %e, "unsubscribe ack failed, rolling back");
            if let Err(undo) = self.store.insert_subscription(&removed).await {
                error!(issue_key = key, chat_id = message.chat_id, error = %undo, "unsubscribe rollback failed");
            }
            return Err(e);
        }

        info!(issue_key = key, chat_id = message.chat_id, "thread unsubscribed");
        Ok(CommandOutcome::Unsubscribed(key.to_string()))
    }

    /// Tell every subscribed thread that the ticket changed status.
    ///
    /// Statuses outside a non-empty tracked list are ignored. Send failures
    /// are counted in the report, never returned.
    pub async fn notify_status_change(
        &self,
        event: &TicketStatusEvent,
    ) -> Result<FanoutReport, TutorDeskError> {
        if !self.tracked_statuses.is_empty() && !self.tracked_statuses.contains(&event.status) {
            debug!(issue_key = %event.issue_key, status = %event.status, "status not tracked");
            return Ok(FanoutReport::default());
        }

        let subs = self.store.subscriptions_for_issue(&event.issue_key).await?;
        if subs.is_empty() {
            debug!(issue_key = %event.issue_key, "no subscribed threads");
            return Ok(FanoutReport::default());
        }

        let text = texts::status_changed(&event.issue_key, &event.status);
        let deliveries = fan_out(subs, |sub| {
            let chat = self.chat.clone();
            let text = text.clone();
            let (chat_id, parent) = (sub.chat_id, sub.message_id);
            async move { chat.send(chat_id, &text, Some(parent)).await }
        })
        .await;

        for d in &deliveries {
            if let Err(e) = &d.result {
                warn!(issue_key = %event.issue_key, chat_id = d.target.chat_id, error = %e, "status notification failed");
            }
        }
        let report = FanoutReport::of(&deliveries);
        if report.failed > 0 {
            warn!(
                issue_key = %event.issue_key,
                failed = report.failed,
                total = report.total,
                "some status notifications failed"
            );
        } else {
            info!(issue_key = %event.issue_key, total = report.total, "status change delivered");
        }
        Ok(report)
    }

    async fn reply(&self, message: &ChatMessageEvent, text: &str) -> Result<(), TutorDeskError> {
        self.chat.send(message.chat_id, text, Some(message.id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutordesk_core::events::MessageEventKind;
    use tutordesk_test_utils::{FlakyStore, MockChatSink, temp_storage};

    fn command(id: i64, chat_id: i64, content: &str) -> ChatMessageEvent {
        ChatMessageEvent {
            id,
            event: MessageEventKind::New,
            content: content.into(),
            user_id: 1,
            chat_id,
            created_at: Utc::now(),
            parent_message_id: None,
            thread: None,
        }
    }

    async fn registry_with(
        chat: Arc<MockChatSink>,
    ) -> (SubscriptionRegistry, Arc<FlakyStore>, tempfile::TempDir) {
        let (storage, dir) = temp_storage().await;
        let store = Arc::new(FlakyStore::new(storage));
        let registry =
            SubscriptionRegistry::new(store.clone(), chat, &TrackerConfig::default()).unwrap();
        (registry, store, dir)
    }

    #[tokio::test]
    async fn subscribe_persists_and_acknowledges() {
        let chat = Arc::new(MockChatSink::new());
        let (registry, store, _dir) = registry_with(chat.clone()).await;

        let out = registry
            .subscribe(&command(5, 10, "/subscribe BACKLOG-42 please"))
            .await
            .unwrap();
        assert_eq!(out, CommandOutcome::Subscribed("BACKLOG-42".into()));

        let sub = store.find_subscription("BACKLOG-42", 10).await.unwrap().unwrap();
        assert_eq!(sub.message_id, 5);
        let sent = chat.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, 10);
        assert_eq!(sent[0].parent_message_id, Some(5));
        assert_eq!(sent[0].text, "Я сообщу вам об изменении статуса тикета BACKLOG-42");
    }

    #[tokio::test]
    async fn double_subscribe_keeps_one_row() {
        let chat = Arc::new(MockChatSink::new());
        let (registry, store, _dir) = registry_with(chat.clone()).await;

        registry.subscribe(&command(5, 10, "BACKLOG-1")).await.unwrap();
        let out = registry.subscribe(&command(6, 10, "BACKLOG-1")).await.unwrap();
        assert_eq!(out, CommandOutcome::AlreadySubscribed("BACKLOG-1".into()));

        assert_eq!(store.subscriptions_for_issue("BACKLOG-1").await.unwrap().len(), 1);
        let sent = chat.sent_messages().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].text, "Тикет BACKLOG-1 уже отслеживается в этом треде");
    }

    #[tokio::test]
    async fn commands_without_key_are_noops() {
        let chat = Arc::new(MockChatSink::new());
        let (registry, _store, _dir) = registry_with(chat.clone()).await;

        let out = registry.subscribe(&command(5, 10, "OTHER-1 backlog-2")).await.unwrap();
        assert_eq!(out, CommandOutcome::NoIssueKey);
        let out = registry.unsubscribe(&command(6, 10, "nothing here")).await.unwrap();
        assert_eq!(out, CommandOutcome::NoIssueKey);
        assert_eq!(chat.sent_count().await, 0);
    }

    #[tokio::test]
    async fn unsubscribe_missing_pair_replies_not_tracked() {
        let chat = Arc::new(MockChatSink::new());
        let (registry, store, _dir) = registry_with(chat.clone()).await;

        let out = registry.unsubscribe(&command(5, 10, "BACKLOG-7")).await.unwrap();
        assert_eq!(out, CommandOutcome::NotSubscribed("BACKLOG-7".into()));
        assert!(store.subscriptions_for_issue("BACKLOG-7").await.unwrap().is_empty());
        let sent = chat.sent_messages().await;
        assert_eq!(sent[0].text, "Тикет BACKLOG-7 не отслеживается в этом треде");
    }

    #[tokio::test]
    async fn unsubscribe_removes_and_acknowledges() {
        let chat = Arc::new(MockChatSink::new());
        let (registry, store, _dir) = registry_with(chat.clone()).await;

        registry.subscribe(&command(5, 10, "BACKLOG-7")).await.unwrap();
        let out = registry.unsubscribe(&command(6, 10, "stop BACKLOG-7")).await.unwrap();
        assert_eq!(out, CommandOutcome::Unsubscribed("BACKLOG-7".into()));
        assert!(store.find_subscription("BACKLOG-7", 10).await.unwrap().is_none());
        let sent = chat.sent_messages().await;
        assert_eq!(sent[1].text, "Тикет BACKLOG-7 больше не отслеживается в этом треде");
        assert_eq!(sent[1].parent_message_id, Some(6));
    }

    #[tokio::test]
    async fn insert_failure_sends_nothing() {
        let chat = Arc::new(MockChatSink::new());
        let (registry, store, _dir) = registry_with(chat.clone()).await;
        store.fail_subscription_writes(true);

        let err = registry.subscribe(&command(5, 10, "BACKLOG-3")).await.unwrap_err();
        assert!(err.is_storage());
        assert_eq!(chat.sent_count().await, 0);

        store.fail_subscription_writes(false);
        assert!(store.find_subscription("BACKLOG-3", 10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_ack_rolls_back_subscribe() {
        let chat = Arc::new(MockChatSink::new());
        let (registry, store, _dir) = registry_with(chat.clone()).await;
        chat.fail_chat(10).await;

        let err = registry.subscribe(&command(5, 10, "BACKLOG-3")).await.unwrap_err();
        assert!(!err.is_storage());
        assert!(store.find_subscription("BACKLOG-3", 10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_ack_rolls_back_unsubscribe() {
        let chat = Arc::new(MockChatSink::new());
        let (registry, store, _dir) = registry_with(chat.clone()).await;

        registry.subscribe(&command(5, 10, "BACKLOG-3")).await.unwrap();
        chat.fail_chat(10).await;
        registry.unsubscribe(&command(6, 10, "BACKLOG-3")).await.unwrap_err();

        let restored = store.find_subscription("BACKLOG-3", 10).await.unwrap().unwrap();
        assert_eq!(restored.message_id, 5);
    }

    #[tokio::test]
    async fn status_change_fans_out_with_isolated_failures() {
        let chat = Arc::new(MockChatSink::new());
        let (registry, _store, _dir) = registry_with(chat.clone()).await;

        registry.subscribe(&command(5, 10, "BACKLOG-9")).await.unwrap();
        registry.subscribe(&command(6, 11, "BACKLOG-9")).await.unwrap();
        chat.clear_sent().await;
        chat.fail_chat(10).await;

        let report = registry
            .notify_status_change(&TicketStatusEvent {
                issue_key: "BACKLOG-9".into(),
                status: "Закрыт".into(),
            })
            .await
            .unwrap();
        assert_eq!(report, FanoutReport { total: 2, failed: 1 });

        let sent = chat.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, 11);
        assert_eq!(sent[0].parent_message_id, Some(6));
        assert_eq!(sent[0].text, "Тикет BACKLOG-9 был переведён в статус Закрыт");
    }

    #[tokio::test]
    async fn untracked_status_is_ignored() {
        let chat = Arc::new(MockChatSink::new());
        let (registry, _store, _dir) = registry_with(chat.clone()).await;

        registry.subscribe(&command(5, 10, "BACKLOG-9")).await.unwrap();
        chat.clear_sent().await;
        let report = registry
            .notify_status_change(&TicketStatusEvent {
                issue_key: "BACKLOG-9".into(),
                status: "В работе".into(),
            })
            .await
            .unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(chat.sent_count().await, 0);
    }

    #[tokio::test]
    async fn empty_tracked_list_tracks_every_status() {
        let (storage, _dir) = temp_storage().await;
        let chat = Arc::new(MockChatSink::new());
        let config = TrackerConfig {
            tracked_statuses: vec![],
            ..TrackerConfig::default()
        };
        let registry = SubscriptionRegistry::new(storage, chat.clone(), &config).unwrap();

        registry.subscribe(&command(5, 10, "BACKLOG-9")).await.unwrap();
        let report = registry
            .notify_status_change(&TicketStatusEvent {
                issue_key: "BACKLOG-9".into(),
                status: "В работе".into(),
            })
            .await
            .unwrap();
        assert_eq!(report.delivered(), 1);
    }
}
