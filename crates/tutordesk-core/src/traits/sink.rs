// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound notification sinks.
//!
//! Both sinks may fail per call and give no ordering guarantee across calls.
//! Callers that fan out treat every send independently.

use async_trait::async_trait;

use crate::error::TutorDeskError;
use crate::traits::adapter::PluginAdapter;

/// Sends plain-text messages into chat-platform chats and threads.
#[async_trait]
pub trait ChatSink: PluginAdapter {
    /// Post `text` into `chat_id`, optionally as a reply to `parent_message_id`.
    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        parent_message_id: Option<i64>,
    ) -> Result<(), TutorDeskError>;
}

/// Delivers escalation digests to the on-duty channel.
#[async_trait]
pub trait EscalationSink: PluginAdapter {
    async fn send(&self, channel_id: i64, text: &str) -> Result<(), TutorDeskError>;
}
