// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routes chat platform events to the correlator or the resolver.

use std::sync::Arc;

use tracing::debug;
use tutordesk_core::events::{MessageEventKind, PlatformEvent, ReactionEventKind};
use tutordesk_core::types::{GroupAssignment, ResolvedGroup};
use tutordesk_core::{TutorDeskError, UserDirectory};

use crate::correlator::Correlator;
use crate::resolver::Resolver;
use crate::roles::{RoleClassifier, UserRole};

/// What handling one platform event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A student question was recorded.
    Recorded(GroupAssignment),
    /// A deleted message was forgotten (`false` if it was never tracked).
    Deleted(bool),
    /// A staff reply or reaction was processed.
    Resolved(Option<ResolvedGroup>),
    /// The event needs no action.
    Ignored,
}

pub struct EventDispatcher {
    classifier: RoleClassifier,
    directory: Arc<dyn UserDirectory>,
    correlator: Correlator,
    resolver: Resolver,
}

impl EventDispatcher {
    pub fn new(
        classifier: RoleClassifier,
        directory: Arc<dyn UserDirectory>,
        correlator: Correlator,
        resolver: Resolver,
    ) -> Self {
        Self {
            classifier,
            directory,
            correlator,
            resolver,
        }
    }

    async fn role_of(&self, user_id: i64) -> Result<UserRole, TutorDeskError> {
        let tags = self.directory.user_tags(user_id).await?;
        let role = self.classifier.classify(&tags);
        debug!(user_id, ?role, "classified user");
        Ok(role)
    }

    pub async fn dispatch(&self, event: &PlatformEvent) -> Result<DispatchOutcome, TutorDeskError> {
        match event {
            PlatformEvent::Message(message) => match message.event {
                MessageEventKind::New => match self.role_of(message.user_id).await? {
                    UserRole::Student(course) => self
                        .correlator
                        .record_new_message(message, Some(course))
                        .await
                        .map(DispatchOutcome::Recorded),
                    role if role.can_resolve() => self
                        .resolver
                        .resolve_from_reply(message, &role)
                        .await
                        .map(DispatchOutcome::Resolved),
                    _ => {
                        debug!(message_id = message.id, "message from unclassified user");
                        Ok(DispatchOutcome::Ignored)
                    }
                },
                MessageEventKind::Delete => self
                    .correlator
                    .record_deleted_message(message.id)
                    .await
                    .map(DispatchOutcome::Deleted),
                MessageEventKind::Update | MessageEventKind::Other => Ok(DispatchOutcome::Ignored),
            },
            PlatformEvent::Reaction(reaction) => {
                if reaction.event != ReactionEventKind::New {
                    return Ok(DispatchOutcome::Ignored);
                }
                let role = self.role_of(reaction.user_id).await?;
                self.resolver
                    .resolve_from_reaction(reaction, &role)
                    .await
                    .map(DispatchOutcome::Resolved)
            }
            PlatformEvent::Unsupported => Ok(DispatchOutcome::Ignored),
        }
    }
}
