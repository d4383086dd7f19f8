// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory user directory.

use std::collections::HashMap;

use async_trait::async_trait;

use tutordesk_core::{
    AdapterType, ChatUser, HealthStatus, PluginAdapter, TutorDeskError, UserDirectory,
};

/// A fixed set of users and their tags. Unknown ids fail the lookup.
#[derive(Debug, Clone, Default)]
pub struct MockDirectory {
    users: HashMap<i64, ChatUser>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user<S: Into<String>>(
        mut self,
        user_id: i64,
        tags: impl IntoIterator<Item = S>,
    ) -> Self {
        self.users.insert(user_id, ChatUser::new(user_id, tags));
        self
    }
}

#[async_trait]
impl PluginAdapter for MockDirectory {
    fn name(&self) -> &str {
        "mock-directory"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Directory
    }

    async fn health_check(&self) -> Result<HealthStatus, TutorDeskError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl UserDirectory for MockDirectory {
    async fn get_user(&self, user_id: i64) -> Result<ChatUser, TutorDeskError> {
        self.users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| TutorDeskError::channel(format!("user {user_id} not found")))
    }
}
