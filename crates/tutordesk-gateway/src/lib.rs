// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook gateway for TutorDesk.
//!
//! Receives Pachca outgoing webhooks and tracker triggers over HTTP and
//! hands them to the engine. Only persistence failures surface as HTTP
//! errors; every other outcome is acknowledged with 200 so webhook
//! senders do not redeliver.

pub mod handlers;
pub mod server;

pub use server::{GatewayState, HealthState, build_router, start_server};
