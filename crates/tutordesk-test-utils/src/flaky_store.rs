// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temp SQLite storage and a failure-injecting wrapper around it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tutordesk_config::model::StorageConfig;
use tutordesk_core::types::{
    GroupAssignment, GroupId, GroupLookup, NewStudentMessage, Resolution, ResolvedGroup,
    StudentMessage, ThreadSubscription,
};
use tutordesk_core::{MessageStore, StorageAdapter, SubscriptionStore, TutorDeskError};
use tutordesk_storage::SqliteStorage;

/// Open an initialized [`SqliteStorage`] in a fresh temp directory.
///
/// Keep the returned directory alive for as long as the storage is used.
pub async fn temp_storage() -> (Arc<SqliteStorage>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = StorageConfig {
        database_path: dir.path().join("test.db").to_string_lossy().into_owned(),
        wal_mode: true,
    };
    let storage = SqliteStorage::new(config);
    storage.initialize().await.expect("initialize temp storage");
    (Arc::new(storage), dir)
}

fn injected(what: &str) -> TutorDeskError {
    TutorDeskError::Storage {
        source: format!("injected {what} failure").into(),
    }
}

/// Wraps [`SqliteStorage`] and fails selected operations on demand.
///
/// - `fail_messages`: every [`MessageStore`] call fails before reaching SQLite
/// - `fail_subscription_writes`: subscription inserts and deletes fail
///
/// [`MessageStore`] calls are counted whether or not they fail.
pub struct FlakyStore {
    inner: Arc<SqliteStorage>,
    fail_messages: AtomicBool,
    fail_subscription_writes: AtomicBool,
    message_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<SqliteStorage>) -> Self {
        Self {
            inner,
            fail_messages: AtomicBool::new(false),
            fail_subscription_writes: AtomicBool::new(false),
            message_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_messages(&self, fail: bool) {
        self.fail_messages.store(fail, Ordering::SeqCst);
    }

    pub fn fail_subscription_writes(&self, fail: bool) {
        self.fail_subscription_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of message store calls made so far.
    pub fn message_calls(&self) -> usize {
        self.message_calls.load(Ordering::SeqCst)
    }

    fn enter_message_call(&self) -> Result<(), TutorDeskError> {
        self.message_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_messages.load(Ordering::SeqCst) {
            return Err(injected("message store"));
        }
        Ok(())
    }

    fn check_subscription_write(&self) -> Result<(), TutorDeskError> {
        if self.fail_subscription_writes.load(Ordering::SeqCst) {
            return Err(injected("subscription write"));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for FlakyStore {
    async fn record_student_message(
        &self,
        message: NewStudentMessage,
        lookup: GroupLookup,
        fallback: GroupId,
    ) -> Result<GroupAssignment, TutorDeskError> {
        self.enter_message_call()?;
        self.inner.record_student_message(message, lookup, fallback).await
    }

    async fn delete_student_message(&self, message_id: i64) -> Result<bool, TutorDeskError> {
        self.enter_message_call()?;
        self.inner.delete_student_message(message_id).await
    }

    async fn resolve_group(
        &self,
        target_message_id: i64,
        resolution: Resolution,
    ) -> Result<Option<ResolvedGroup>, TutorDeskError> {
        self.enter_message_call()?;
        self.inner.resolve_group(target_message_id, resolution).await
    }

    async fn pending_sent_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<StudentMessage>, TutorDeskError> {
        self.enter_message_call()?;
        self.inner.pending_sent_before(cutoff).await
    }

    async fn get_student_message(
        &self,
        message_id: i64,
    ) -> Result<Option<StudentMessage>, TutorDeskError> {
        self.enter_message_call()?;
        self.inner.get_student_message(message_id).await
    }

    async fn group_members(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<StudentMessage>, TutorDeskError> {
        self.enter_message_call()?;
        self.inner.group_members(group_id).await
    }
}

#[async_trait]
impl SubscriptionStore for FlakyStore {
    async fn find_subscription(
        &self,
        issue_key: &str,
        chat_id: i64,
    ) -> Result<Option<ThreadSubscription>, TutorDeskError> {
        self.inner.find_subscription(issue_key, chat_id).await
    }

    async fn insert_subscription(&self, sub: &ThreadSubscription) -> Result<bool, TutorDeskError> {
        self.check_subscription_write()?;
        self.inner.insert_subscription(sub).await
    }

    async fn delete_subscription(
        &self,
        issue_key: &str,
        chat_id: i64,
    ) -> Result<Option<ThreadSubscription>, TutorDeskError> {
        self.check_subscription_write()?;
        self.inner.delete_subscription(issue_key, chat_id).await
    }

    async fn subscriptions_for_issue(
        &self,
        issue_key: &str,
    ) -> Result<Vec<ThreadSubscription>, TutorDeskError> {
        self.inner.subscriptions_for_issue(issue_key).await
    }
}
