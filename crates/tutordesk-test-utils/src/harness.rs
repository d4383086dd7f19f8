// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full engine over a temp SQLite database and
//! mock sinks. Inbound webhooks are driven through [`TestHarness::dispatch`]
//! and outbound traffic is asserted on the mocks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tutordesk_config::model::TutorDeskConfig;
use tutordesk_core::events::{ChatMessageEvent, MessageEventKind, PlatformEvent};
use tutordesk_core::{StorageAdapter, TutorDeskError};
use tutordesk_engine::{
    Correlator, DispatchOutcome, EscalationPoller, EventDispatcher, Resolver, RoleClassifier,
    SubscriptionRegistry,
};
use tutordesk_storage::SqliteStorage;

use crate::mock_directory::MockDirectory;
use crate::mock_sink::{MockChatSink, MockEscalationSink};

/// Escalation channel used when the config names none.
pub const TEST_ESCALATION_CHANNEL: i64 = -100_500;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: TutorDeskConfig,
    directory: MockDirectory,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: TutorDeskConfig::default(),
            directory: MockDirectory::new(),
        }
    }

    /// Replace the default configuration. Storage settings are overridden.
    pub fn with_config(mut self, config: TutorDeskConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a platform user with the given tags.
    pub fn with_user<S: Into<String>>(
        mut self,
        user_id: i64,
        tags: impl IntoIterator<Item = S>,
    ) -> Self {
        self.directory = self.directory.with_user(user_id, tags);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, TutorDeskError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| TutorDeskError::Storage { source: e.into() })?;
        let mut config = self.config;
        config.storage.database_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .into_owned();

        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await?;

        let chat = Arc::new(MockChatSink::new());
        let escalation = Arc::new(MockEscalationSink::new());
        let directory = Arc::new(self.directory);

        let dispatcher = Arc::new(EventDispatcher::new(
            RoleClassifier::new(&config.roles)?,
            directory.clone(),
            Correlator::from_config(storage.clone(), &config.grouping)?,
            Resolver::new(storage.clone()),
        ));
        let registry = Arc::new(SubscriptionRegistry::new(
            storage.clone(),
            chat.clone(),
            &config.tracker,
        )?);
        let channel_id = config
            .telegram
            .escalation_chat_id
            .unwrap_or(TEST_ESCALATION_CHANNEL);
        let poller = Arc::new(EscalationPoller::new(
            storage.clone(),
            escalation.clone(),
            channel_id,
            &config.escalation,
        )?);

        Ok(TestHarness {
            config,
            storage,
            chat,
            escalation,
            directory,
            dispatcher,
            registry,
            poller,
            _temp_dir: temp_dir,
        })
    }
}

/// A fully wired engine backed by mocks and a temp database.
pub struct TestHarness {
    pub config: TutorDeskConfig,
    pub storage: Arc<SqliteStorage>,
    pub chat: Arc<MockChatSink>,
    pub escalation: Arc<MockEscalationSink>,
    pub directory: Arc<MockDirectory>,
    pub dispatcher: Arc<EventDispatcher>,
    pub registry: Arc<SubscriptionRegistry>,
    pub poller: Arc<EscalationPoller>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Route one platform event through the dispatcher.
    pub async fn dispatch(&self, event: PlatformEvent) -> Result<DispatchOutcome, TutorDeskError> {
        self.dispatcher.dispatch(&event).await
    }
}

/// A new top-level chat message event.
pub fn chat_message(
    id: i64,
    user_id: i64,
    chat_id: i64,
    content: &str,
    created_at: DateTime<Utc>,
) -> ChatMessageEvent {
    ChatMessageEvent {
        id,
        event: MessageEventKind::New,
        content: content.to_string(),
        user_id,
        chat_id,
        created_at,
        parent_message_id: None,
        thread: None,
    }
}
