// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tutordesk serve`: webhook gateway plus escalation poller.
//!
//! Both share one cancellation token fired by SIGINT/SIGTERM. The gateway
//! drains in-flight requests and the poller finishes its current cycle
//! before the database is checkpointed and the process exits.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tutordesk_config::TutorDeskConfig;
use tutordesk_core::{PluginAdapter, StorageAdapter, TutorDeskError};
use tutordesk_engine::shutdown::{drain_task, install_signal_handler};
use tutordesk_engine::{
    Correlator, EscalationPoller, EventDispatcher, Resolver, RoleClassifier, SubscriptionRegistry,
};
use tutordesk_gateway::{GatewayState, HealthState, start_server};
use tutordesk_pachca::PachcaClient;
use tutordesk_storage::SqliteStorage;
use tutordesk_telegram::TelegramEscalation;

/// Upper bound on waiting for the poller after shutdown is requested.
const POLLER_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the `tutordesk serve` command.
pub async fn run_serve(config: TutorDeskConfig) -> Result<(), TutorDeskError> {
    crate::init_tracing(&config.service.log_level);

    info!("starting tutordesk serve");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    info!(path = %config.storage.database_path, "storage initialized");

    let pachca = Arc::new(PachcaClient::new(&config.pachca).map_err(|e| {
        error!(error = %e, "failed to initialize Pachca client");
        eprintln!("error: Pachca bot token required. Set via: config or TUTORDESK_PACHCA_TOKEN env var");
        e
    })?);

    let dispatcher = Arc::new(EventDispatcher::new(
        RoleClassifier::new(&config.roles)?,
        pachca.clone(),
        Correlator::from_config(storage.clone(), &config.grouping)?,
        Resolver::new(storage.clone()),
    ));
    let registry = Arc::new(SubscriptionRegistry::new(
        storage.clone(),
        pachca.clone(),
        &config.tracker,
    )?);

    let mut adapters = vec![
        storage.clone() as Arc<dyn PluginAdapter>,
        pachca.clone() as Arc<dyn PluginAdapter>,
    ];

    let poller = match (&config.telegram.bot_token, config.telegram.escalation_chat_id) {
        (Some(_), Some(channel_id)) => {
            let telegram = Arc::new(TelegramEscalation::new(&config.telegram)?);
            adapters.push(telegram.clone() as Arc<dyn PluginAdapter>);
            Some(Arc::new(EscalationPoller::new(
                storage.clone(),
                telegram,
                channel_id,
                &config.escalation,
            )?))
        }
        _ => {
            warn!("telegram.bot_token or telegram.escalation_chat_id not set, SLA escalations disabled");
            None
        }
    };

    let cancel = install_signal_handler();
    let poller_handle = poller.clone().map(|p| p.spawn(cancel.clone()));

    let state = GatewayState {
        dispatcher,
        registry,
        health: HealthState::new(adapters, poller),
    };
    let served = start_server(&config.gateway, state, cancel.clone()).await;
    if let Err(e) = &served {
        error!(error = %e, "gateway stopped with an error");
    }

    // The gateway may have stopped on its own; make sure the poller follows.
    cancel.cancel();
    if let Some(handle) = poller_handle {
        drain_task("escalation poller", handle, POLLER_DRAIN_TIMEOUT).await;
    }

    storage.close().await?;
    info!("tutordesk stopped");
    served
}
