// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capturing chat and escalation sinks.
//!
//! Successful sends are recorded for assertion. Failing sends return a
//! channel error and are not recorded.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tutordesk_core::{
    AdapterType, ChatSink, EscalationSink, HealthStatus, PluginAdapter, TutorDeskError,
};

/// One message posted through [`MockChatSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    pub parent_message_id: Option<i64>,
}

/// A mock chat platform sink for testing.
pub struct MockChatSink {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    failing_chats: Arc<Mutex<HashSet<i64>>>,
}

impl MockChatSink {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failing_chats: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Make every later send into `chat_id` fail.
    pub async fn fail_chat(&self, chat_id: i64) {
        self.failing_chats.lock().await.insert(chat_id);
    }

    /// Get all messages that were sent successfully.
    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for MockChatSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChatSink {
    fn name(&self) -> &str {
        "mock-chat"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Chat
    }

    async fn health_check(&self) -> Result<HealthStatus, TutorDeskError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ChatSink for MockChatSink {
    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        parent_message_id: Option<i64>,
    ) -> Result<(), TutorDeskError> {
        if self.failing_chats.lock().await.contains(&chat_id) {
            return Err(TutorDeskError::channel(format!("mock chat {chat_id} unavailable")));
        }
        self.sent.lock().await.push(SentMessage {
            chat_id,
            text: text.to_string(),
            parent_message_id,
        });
        Ok(())
    }
}

/// A mock escalation channel for testing.
pub struct MockEscalationSink {
    sent: Arc<Mutex<Vec<(i64, String)>>>,
    fail_patterns: Arc<Mutex<Vec<String>>>,
}

impl MockEscalationSink {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_patterns: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail every later send whose text contains `needle`.
    pub async fn fail_when_contains(&self, needle: &str) {
        self.fail_patterns.lock().await.push(needle.to_string());
    }

    /// `(channel_id, text)` of every successful send.
    pub async fn sent_messages(&self) -> Vec<(i64, String)> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

impl Default for MockEscalationSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockEscalationSink {
    fn name(&self) -> &str {
        "mock-escalation"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Escalation
    }

    async fn health_check(&self) -> Result<HealthStatus, TutorDeskError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EscalationSink for MockEscalationSink {
    async fn send(&self, channel_id: i64, text: &str) -> Result<(), TutorDeskError> {
        let failing = self
            .fail_patterns
            .lock()
            .await
            .iter()
            .any(|needle| text.contains(needle.as_str()));
        if failing {
            return Err(TutorDeskError::channel("mock escalation channel rejected digest"));
        }
        self.sent.lock().await.push((channel_id, text.to_string()));
        Ok(())
    }
}
