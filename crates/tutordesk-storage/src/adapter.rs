// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use tutordesk_config::model::StorageConfig;
use tutordesk_core::types::{
    GroupAssignment, GroupId, GroupLookup, NewStudentMessage, Resolution, ResolvedGroup,
    StudentMessage, ThreadSubscription,
};
use tutordesk_core::{
    AdapterType, HealthStatus, MessageStore, PluginAdapter, StorageAdapter, SubscriptionStore,
    TutorDeskError,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened on the first call to
/// [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is called.
    ///
    /// [`initialize`]: StorageAdapter::initialize
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, TutorDeskError> {
        self.db.get().ok_or_else(|| TutorDeskError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, TutorDeskError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), TutorDeskError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| TutorDeskError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), TutorDeskError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl MessageStore for SqliteStorage {
    async fn record_student_message(
        &self,
        message: NewStudentMessage,
        lookup: GroupLookup,
        fallback: GroupId,
    ) -> Result<GroupAssignment, TutorDeskError> {
        queries::student_messages::record(self.db()?, message, lookup, fallback).await
    }

    async fn delete_student_message(&self, message_id: i64) -> Result<bool, TutorDeskError> {
        queries::student_messages::delete(self.db()?, message_id).await
    }

    async fn resolve_group(
        &self,
        target_message_id: i64,
        resolution: Resolution,
    ) -> Result<Option<ResolvedGroup>, TutorDeskError> {
        queries::student_messages::resolve_group(self.db()?, target_message_id, resolution).await
    }

    async fn pending_sent_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<StudentMessage>, TutorDeskError> {
        queries::student_messages::pending_sent_before(self.db()?, cutoff).await
    }

    async fn get_student_message(
        &self,
        message_id: i64,
    ) -> Result<Option<StudentMessage>, TutorDeskError> {
        queries::student_messages::get(self.db()?, message_id).await
    }

    async fn group_members(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<StudentMessage>, TutorDeskError> {
        queries::student_messages::group_members(self.db()?, group_id).await
    }
}

#[async_trait]
impl SubscriptionStore for SqliteStorage {
    async fn find_subscription(
        &self,
        issue_key: &str,
        chat_id: i64,
    ) -> Result<Option<ThreadSubscription>, TutorDeskError> {
        queries::subscriptions::find(self.db()?, issue_key, chat_id).await
    }

    async fn insert_subscription(&self, sub: &ThreadSubscription) -> Result<bool, TutorDeskError> {
        queries::subscriptions::insert(self.db()?, sub).await
    }

    async fn delete_subscription(
        &self,
        issue_key: &str,
        chat_id: i64,
    ) -> Result<Option<ThreadSubscription>, TutorDeskError> {
        queries::subscriptions::delete(self.db()?, issue_key, chat_id).await
    }

    async fn subscriptions_for_issue(
        &self,
        issue_key: &str,
    ) -> Result<Vec<ThreadSubscription>, TutorDeskError> {
        queries::subscriptions::for_issue(self.db()?, issue_key).await
    }
}
