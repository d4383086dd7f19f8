// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the collaborators the engine consumes.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod directory;
pub mod sink;
pub mod storage;

pub use adapter::PluginAdapter;
pub use directory::UserDirectory;
pub use sink::{ChatSink, EscalationSink};
pub use storage::{MessageStore, StorageAdapter, SubscriptionStore};
