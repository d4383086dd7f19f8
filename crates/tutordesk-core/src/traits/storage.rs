// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transactional store traits.
//!
//! Every method is one logical operation executed in one transaction: it
//! either fully applies or leaves the store unchanged.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::TutorDeskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    GroupAssignment, GroupId, GroupLookup, NewStudentMessage, Resolution, ResolvedGroup,
    StudentMessage, ThreadSubscription,
};

/// Lifecycle of a storage backend.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), TutorDeskError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), TutorDeskError>;
}

/// Persistence of student messages and their group resolution state.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Record a new pending message, joining the most recent pending message
    /// matched by `lookup` or opening a group with `fallback` otherwise.
    ///
    /// Lookup and insert happen in one transaction.
    async fn record_student_message(
        &self,
        message: NewStudentMessage,
        lookup: GroupLookup,
        fallback: GroupId,
    ) -> Result<GroupAssignment, TutorDeskError>;

    /// Delete a message row. Returns `false` if no such row existed.
    async fn delete_student_message(&self, message_id: i64) -> Result<bool, TutorDeskError>;

    /// Resolve the group of the pending message `target_message_id`.
    ///
    /// Every pending row sharing the target's group receives `resolution` in
    /// one transaction. Returns `None` when the target is not pending.
    async fn resolve_group(
        &self,
        target_message_id: i64,
        resolution: Resolution,
    ) -> Result<Option<ResolvedGroup>, TutorDeskError>;

    /// All pending messages sent at or before `cutoff`.
    async fn pending_sent_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<StudentMessage>, TutorDeskError>;

    async fn get_student_message(
        &self,
        message_id: i64,
    ) -> Result<Option<StudentMessage>, TutorDeskError>;

    /// All rows of a group ordered by `created_at`.
    async fn group_members(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<StudentMessage>, TutorDeskError>;
}

/// Persistence of ticket subscriptions keyed by `(issue_key, chat_id)`.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn find_subscription(
        &self,
        issue_key: &str,
        chat_id: i64,
    ) -> Result<Option<ThreadSubscription>, TutorDeskError>;

    /// Insert a subscription. Returns `false` if the pair already existed.
    async fn insert_subscription(&self, sub: &ThreadSubscription) -> Result<bool, TutorDeskError>;

    /// Delete a subscription, returning the removed row if there was one.
    async fn delete_subscription(
        &self,
        issue_key: &str,
        chat_id: i64,
    ) -> Result<Option<ThreadSubscription>, TutorDeskError>;

    async fn subscriptions_for_issue(
        &self,
        issue_key: &str,
    ) -> Result<Vec<ThreadSubscription>, TutorDeskError>;
}
