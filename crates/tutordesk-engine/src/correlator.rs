// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Groups incoming student messages into rolling conversation windows.
//!
//! A new message joins the most recent pending message of the same student
//! in the same chat (or the same thread) sent within `time_frame` of it.
//! Otherwise it opens a fresh group. The lookup and the insert run in one
//! store transaction.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};
use tutordesk_config::model::GroupingConfig;
use tutordesk_core::events::ChatMessageEvent;
use tutordesk_core::types::{GroupAssignment, GroupLookup, NewStudentMessage};
use tutordesk_core::{GroupId, MessageStore, TutorDeskError};

pub struct Correlator {
    store: Arc<dyn MessageStore>,
    time_frame: chrono::Duration,
}

impl Correlator {
    pub fn new(store: Arc<dyn MessageStore>, time_frame: Duration) -> Result<Self, TutorDeskError> {
        let time_frame = chrono::Duration::from_std(time_frame)
            .map_err(|e| TutorDeskError::Config(format!("grouping time frame: {e}")))?;
        Ok(Self { store, time_frame })
    }

    pub fn from_config(
        store: Arc<dyn MessageStore>,
        config: &GroupingConfig,
    ) -> Result<Self, TutorDeskError> {
        Self::new(store, Duration::from_secs(config.time_frame_secs))
    }

    /// Persist a new student message as pending and assign its group.
    ///
    /// `course` comes from the author's tags. Redelivered message ids keep
    /// their original row.
    pub async fn record_new_message(
        &self,
        message: &ChatMessageEvent,
        course: Option<String>,
    ) -> Result<GroupAssignment, TutorDeskError> {
        let sent_at = message.created_at;
        let draft = NewStudentMessage {
            message_id: message.id,
            user_id: message.user_id,
            chat_id: message.chat_id,
            thread_message_id: message.thread.map(|t| t.message_id),
            thread_chat_id: message.thread.map(|t| t.chat_id),
            text: message.content.clone(),
            sent_at,
            course,
            created_at: Utc::now(),
        };
        let (Some(window_start), Some(window_end)) = (
            sent_at.checked_sub_signed(self.time_frame),
            sent_at.checked_add_signed(self.time_frame),
        ) else {
            return Err(TutorDeskError::Config(format!(
                "grouping time frame of {}s does not fit around {sent_at}",
                self.time_frame.num_seconds()
            )));
        };
        let lookup = GroupLookup {
            user_id: message.user_id,
            chat_id: message.chat_id,
            thread_message_id: draft.thread_message_id,
            window_start,
            window_end,
        };

        let assignment = self
            .store
            .record_student_message(draft, lookup, GroupId::generate())
            .await?;

        match &assignment {
            GroupAssignment::Opened(group) => {
                info!(message_id = message.id, group_id = %group, "opened message group")
            }
            GroupAssignment::Joined(group) => {
                info!(message_id = message.id, group_id = %group, "joined message group")
            }
            GroupAssignment::Duplicate(group) => {
                debug!(message_id = message.id, group_id = %group, "message already recorded")
            }
        }
        Ok(assignment)
    }

    /// Forget a deleted message. Unknown ids are logged and ignored.
    pub async fn record_deleted_message(&self, message_id: i64) -> Result<bool, TutorDeskError> {
        let deleted = self.store.delete_student_message(message_id).await?;
        if deleted {
            info!(message_id, "deleted student message");
        } else {
            debug!(message_id, "deleted message was not tracked");
        }
        Ok(deleted)
    }
}
