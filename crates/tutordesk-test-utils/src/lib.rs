// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for TutorDesk integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`temp_storage`] - Initialized SQLite storage in a temp directory
//! - [`FlakyStore`] - Store wrapper with switchable failure injection
//! - [`MockChatSink`] / [`MockEscalationSink`] - Capturing outbound sinks
//! - [`MockDirectory`] - In-memory user tag directory
//! - [`TestHarness`] - Fully wired engine over the mocks above

pub mod flaky_store;
pub mod harness;
pub mod mock_directory;
pub mod mock_sink;

pub use flaky_store::{FlakyStore, temp_storage};
pub use harness::{TEST_ESCALATION_CHANNEL, TestHarness, TestHarnessBuilder, chat_message};
pub use mock_directory::MockDirectory;
pub use mock_sink::{MockChatSink, MockEscalationSink, SentMessage};
