// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User directory trait for looking up role tags of platform users.

use async_trait::async_trait;

use crate::error::TutorDeskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ChatUser;

/// Resolves a platform user id into a [`ChatUser`] carrying its tags.
#[async_trait]
pub trait UserDirectory: PluginAdapter {
    /// Fetch the user and the tags attached to them.
    async fn get_user(&self, user_id: i64) -> Result<ChatUser, TutorDeskError>;

    /// Tags of the user, used for role classification.
    async fn user_tags(&self, user_id: i64) -> Result<Vec<String>, TutorDeskError> {
        Ok(self.get_user(user_id).await?.tags)
    }
}
