// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Links staff replies and reactions back to pending question groups.

use std::sync::Arc;

use tracing::{debug, info};
use tutordesk_core::events::{ChatMessageEvent, ReactionEvent, ReactionEventKind};
use tutordesk_core::types::{Resolution, ResolvedGroup};
use tutordesk_core::{MessageStore, TutorDeskError};

use crate::roles::UserRole;

pub struct Resolver {
    store: Arc<dyn MessageStore>,
}

impl Resolver {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// Resolve the group a staff reply answers.
    ///
    /// The target is the replied-to message when the reply names one,
    /// otherwise the thread root. Replies carrying neither are ignored.
    pub async fn resolve_from_reply(
        &self,
        reply: &ChatMessageEvent,
        acting: &UserRole,
    ) -> Result<Option<ResolvedGroup>, TutorDeskError> {
        if !acting.can_resolve() {
            debug!(message_id = reply.id, "reply author cannot resolve questions");
            return Ok(None);
        }
        let Some(target) = reply.parent_message_id.or_else(|| reply.thread_root()) else {
            debug!(message_id = reply.id, "reply has no parent or thread, nothing to resolve");
            return Ok(None);
        };

        let resolution = Resolution {
            resolved_at: reply.created_at,
            reaction_message_id: Some(reply.id),
        };
        self.resolve(target, resolution).await
    }

    /// Resolve the group of a message a staff member reacted to.
    pub async fn resolve_from_reaction(
        &self,
        reaction: &ReactionEvent,
        acting: &UserRole,
    ) -> Result<Option<ResolvedGroup>, TutorDeskError> {
        if reaction.event != ReactionEventKind::New {
            debug!(message_id = reaction.message_id, "ignoring reaction removal");
            return Ok(None);
        }
        if !acting.can_resolve() {
            debug!(message_id = reaction.message_id, "reaction author cannot resolve questions");
            return Ok(None);
        }

        let resolution = Resolution {
            resolved_at: reaction.created_at,
            reaction_message_id: None,
        };
        self.resolve(reaction.message_id, resolution).await
    }

    async fn resolve(
        &self,
        target: i64,
        resolution: Resolution,
    ) -> Result<Option<ResolvedGroup>, TutorDeskError> {
        let resolved = self.store.resolve_group(target, resolution).await?;
        match &resolved {
            Some(group) => info!(
                target,
                group_id = %group.group_id,
                rows = group.rows,
                "resolved message group"
            ),
            None => debug!(target, "no pending message to resolve"),
        }
        Ok(resolved)
    }
}
