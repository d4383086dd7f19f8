// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tutordesk_config::model::GatewayConfig;
use tutordesk_core::{PluginAdapter, TutorDeskError};
use tutordesk_engine::{EscalationPoller, EventDispatcher, SubscriptionRegistry};

use crate::handlers;

/// State behind `GET /health`.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Adapters checked on every health request.
    pub adapters: Vec<Arc<dyn PluginAdapter>>,
    /// `None` when escalations are disabled.
    pub poller: Option<Arc<EscalationPoller>>,
}

impl HealthState {
    pub fn new(adapters: Vec<Arc<dyn PluginAdapter>>, poller: Option<Arc<EscalationPoller>>) -> Self {
        Self {
            start_time: std::time::Instant::now(),
            adapters,
            poller,
        }
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub dispatcher: Arc<EventDispatcher>,
    pub registry: Arc<SubscriptionRegistry>,
    pub health: HealthState,
}

/// Build the router with every webhook route.
///
/// - POST /pachca/events (message and reaction webhooks)
/// - POST /subscribe, POST /unsubscribe (thread commands)
/// - POST /ticket_status_change (tracker trigger)
/// - GET /health
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/pachca/events", post(handlers::post_pachca_event))
        .route("/subscribe", post(handlers::post_subscribe))
        .route("/unsubscribe", post(handlers::post_unsubscribe))
        .route("/ticket_status_change", post(handlers::post_ticket_status_change))
        .route("/health", get(handlers::get_health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the gateway until `shutdown` is cancelled.
///
/// In-flight requests are allowed to finish before this returns.
pub async fn start_server(
    config: &GatewayConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), TutorDeskError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TutorDeskError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| TutorDeskError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server stopped");
    Ok(())
}
