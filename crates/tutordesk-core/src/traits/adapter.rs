// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that all collaborators implement.

use async_trait::async_trait;

use crate::error::TutorDeskError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for all TutorDesk adapters.
///
/// Provides identity and health reporting so the gateway can expose a single
/// health endpoint over every wired collaborator.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the kind of adapter (storage, chat, escalation, directory).
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, TutorDeskError>;
}
