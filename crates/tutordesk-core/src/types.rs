// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common domain types shared across the store, engine, and adapters.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of a message group.
///
/// Assigned once when the first message of a group is recorded and stored
/// alongside every member row. Never recomputed from row contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl GroupId {
    /// Mint a fresh surrogate group id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Chat,
    Escalation,
    Directory,
}

/// A platform user together with the tags used for role classification.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChatUser {
    pub id: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ChatUser {
    pub fn new(id: i64, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            id,
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

/// A persisted student question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentMessage {
    pub message_id: i64,
    pub message_group_id: GroupId,
    pub user_id: i64,
    pub chat_id: i64,
    /// Root message of the thread this message was posted in, if any.
    pub thread_message_id: Option<i64>,
    pub thread_chat_id: Option<i64>,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    pub received_reaction: bool,
    pub received_reaction_at: Option<DateTime<Utc>>,
    /// Id of the expert reply that resolved the group. `None` for reactions.
    pub reaction_message_id: Option<i64>,
    pub course: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StudentMessage {
    pub fn is_pending(&self) -> bool {
        !self.received_reaction
    }

    /// Returns `true` if the message was posted inside a thread.
    pub fn in_thread(&self) -> bool {
        self.thread_message_id.is_some()
    }
}

/// A student message about to be recorded; its group is decided by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudentMessage {
    pub message_id: i64,
    pub user_id: i64,
    pub chat_id: i64,
    pub thread_message_id: Option<i64>,
    pub thread_chat_id: Option<i64>,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    pub course: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewStudentMessage {
    /// Attach the group id chosen for this message and produce a pending row.
    pub fn into_pending(self, group_id: GroupId) -> StudentMessage {
        StudentMessage {
            message_id: self.message_id,
            message_group_id: group_id,
            user_id: self.user_id,
            chat_id: self.chat_id,
            thread_message_id: self.thread_message_id,
            thread_chat_id: self.thread_chat_id,
            text: self.text,
            sent_at: self.sent_at,
            received_reaction: false,
            received_reaction_at: None,
            reaction_message_id: None,
            course: self.course,
            created_at: self.created_at,
        }
    }
}

/// Predicate describing which prior pending messages a new message may join.
///
/// A prior message matches when it belongs to `user_id`, is still pending,
/// was sent inside `[window_start, window_end]`, and either shares `chat_id`
/// or (when `thread_message_id` is set) the same thread root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupLookup {
    pub user_id: i64,
    pub chat_id: i64,
    pub thread_message_id: Option<i64>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

/// Result of recording a new student message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupAssignment {
    /// The message opened a new group.
    Opened(GroupId),
    /// The message joined an existing pending group.
    Joined(GroupId),
    /// A row with this message id already exists; nothing was written.
    Duplicate(GroupId),
}

impl GroupAssignment {
    pub fn group_id(&self) -> &GroupId {
        match self {
            Self::Opened(id) | Self::Joined(id) | Self::Duplicate(id) => id,
        }
    }
}

/// Reaction fields applied to every row of a resolved group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub resolved_at: DateTime<Utc>,
    pub reaction_message_id: Option<i64>,
}

/// Outcome of a successful group resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGroup {
    pub group_id: GroupId,
    /// Number of rows flipped from pending to resolved.
    pub rows: usize,
}

/// A chat thread's registered interest in status changes of one ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSubscription {
    pub issue_key: String,
    pub chat_id: i64,
    /// Message to reply under when the ticket changes status.
    pub message_id: i64,
    pub created_at: DateTime<Utc>,
}
