// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for TutorDesk.
//!
//! This crate provides the domain types, inbound event shapes, error type,
//! and collaborator traits used throughout the workspace. Storage and
//! delivery adapters implement traits defined here; the engine consumes them.

pub mod error;
pub mod events;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::TutorDeskError;
pub use types::{AdapterType, ChatUser, GroupId, HealthStatus, StudentMessage, ThreadSubscription};

pub use traits::{
    ChatSink, EscalationSink, MessageStore, PluginAdapter, StorageAdapter, SubscriptionStore,
    UserDirectory,
};
