// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pachca adapter for TutorDesk.
//!
//! [`PachcaClient`] posts replies into chats and threads ([`ChatSink`]) and
//! looks up user tags for role classification ([`UserDirectory`]).
//!
//! [`ChatSink`]: tutordesk_core::ChatSink
//! [`UserDirectory`]: tutordesk_core::UserDirectory

pub mod client;
pub mod types;

pub use client::PachcaClient;
