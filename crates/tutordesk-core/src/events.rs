// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound event shapes produced by the chat platform and the issue tracker.
//!
//! These mirror the JSON bodies of Pachca outgoing webhooks and the tracker
//! status trigger, so the gateway can deserialize them directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle event carried by a chat message webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageEventKind {
    New,
    Update,
    Delete,
    #[serde(other)]
    Other,
}

/// Lifecycle event carried by a reaction webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionEventKind {
    New,
    Delete,
    #[serde(other)]
    Other,
}

/// Thread a message was posted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRef {
    /// Root message the thread hangs off.
    pub message_id: i64,
    /// Chat the root message lives in.
    #[serde(alias = "message_chat_id")]
    pub chat_id: i64,
}

/// A chat message event (new, edited, or deleted message).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageEvent {
    pub id: i64,
    pub event: MessageEventKind,
    #[serde(default)]
    pub content: String,
    pub user_id: i64,
    pub chat_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub parent_message_id: Option<i64>,
    #[serde(default)]
    pub thread: Option<ThreadRef>,
}

impl ChatMessageEvent {
    /// Root message id of the enclosing thread, if the message is in one.
    pub fn thread_root(&self) -> Option<i64> {
        self.thread.map(|t| t.message_id)
    }
}

/// A reaction added to or removed from a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub event: ReactionEventKind,
    /// Message the reaction was put on.
    pub message_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Any webhook the chat platform delivers to the events endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlatformEvent {
    Message(ChatMessageEvent),
    Reaction(ReactionEvent),
    #[serde(other)]
    Unsupported,
}

/// A ticket changed status in the issue tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketStatusEvent {
    pub issue_key: String,
    pub status: String,
}
