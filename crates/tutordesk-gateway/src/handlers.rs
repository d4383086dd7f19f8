// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the webhook routes.
//!
//! Bodies that fail to parse are logged and acknowledged. Engine errors
//! other than storage failures are acknowledged with `"status": "failed"`.
//! Storage failures answer 500 so the sender retries.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info, warn};

use tutordesk_core::events::{ChatMessageEvent, PlatformEvent, TicketStatusEvent};
use tutordesk_core::types::GroupAssignment;
use tutordesk_core::{HealthStatus, TutorDeskError};
use tutordesk_engine::{CommandOutcome, DispatchOutcome, FanoutReport, PollerState};

use crate::server::GatewayState;

/// Body of every acknowledged webhook.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    /// `ok`, `ignored`, or `failed`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    /// Escalation poller state: `idle`, `scanning`, or `disabled`.
    pub escalation: &'static str,
    pub adapters: Vec<AdapterHealth>,
}

#[derive(Debug, Serialize)]
pub struct AdapterHealth {
    pub name: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

fn acknowledge(route: &str, result: Result<String, TutorDeskError>) -> Response {
    match result {
        Ok(detail) => (
            StatusCode::OK,
            Json(AckResponse {
                status: "ok",
                detail: Some(detail),
            }),
        )
            .into_response(),
        Err(e) if e.is_storage() => {
            error!(route, error = %e, "webhook failed on storage");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            warn!(route, error = %e, "webhook processing failed");
            (
                StatusCode::OK,
                Json(AckResponse {
                    status: "failed",
                    detail: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

fn ignore_malformed(route: &str, rejection: JsonRejection) -> Response {
    warn!(route, error = %rejection.body_text(), "malformed webhook body ignored");
    (
        StatusCode::OK,
        Json(AckResponse {
            status: "ignored",
            detail: Some("malformed body".into()),
        }),
    )
        .into_response()
}

fn describe_dispatch(outcome: DispatchOutcome) -> String {
    match outcome {
        DispatchOutcome::Recorded(GroupAssignment::Opened(group)) => format!("opened group {group}"),
        DispatchOutcome::Recorded(GroupAssignment::Joined(group)) => format!("joined group {group}"),
        DispatchOutcome::Recorded(GroupAssignment::Duplicate(group)) => {
            format!("already recorded in group {group}")
        }
        DispatchOutcome::Deleted(true) => "deleted".into(),
        DispatchOutcome::Deleted(false) => "not tracked".into(),
        DispatchOutcome::Resolved(Some(group)) => {
            format!("resolved {} message(s) of group {}", group.rows, group.group_id)
        }
        DispatchOutcome::Resolved(None) => "nothing to resolve".into(),
        DispatchOutcome::Ignored => "ignored".into(),
    }
}

fn describe_command(outcome: CommandOutcome) -> String {
    match outcome {
        CommandOutcome::Subscribed(key) => format!("subscribed to {key}"),
        CommandOutcome::AlreadySubscribed(key) => format!("already subscribed to {key}"),
        CommandOutcome::Unsubscribed(key) => format!("unsubscribed from {key}"),
        CommandOutcome::NotSubscribed(key) => format!("not subscribed to {key}"),
        CommandOutcome::NoIssueKey => "no issue key".into(),
    }
}

fn describe_fanout(report: FanoutReport) -> String {
    format!("notified {} of {} thread(s)", report.delivered(), report.total)
}

/// POST /pachca/events
pub async fn post_pachca_event(
    State(state): State<GatewayState>,
    payload: Result<Json<PlatformEvent>, JsonRejection>,
) -> Response {
    let Json(event) = match payload {
        Ok(json) => json,
        Err(rejection) => return ignore_malformed("/pachca/events", rejection),
    };
    let result = state.dispatcher.dispatch(&event).await.map(describe_dispatch);
    acknowledge("/pachca/events", result)
}

/// POST /subscribe
pub async fn post_subscribe(
    State(state): State<GatewayState>,
    payload: Result<Json<ChatMessageEvent>, JsonRejection>,
) -> Response {
    let Json(message) = match payload {
        Ok(json) => json,
        Err(rejection) => return ignore_malformed("/subscribe", rejection),
    };
    info!(message_id = message.id, chat_id = message.chat_id, "subscribe command");
    let result = state.registry.subscribe(&message).await.map(describe_command);
    acknowledge("/subscribe", result)
}

/// POST /unsubscribe
pub async fn post_unsubscribe(
    State(state): State<GatewayState>,
    payload: Result<Json<ChatMessageEvent>, JsonRejection>,
) -> Response {
    let Json(message) = match payload {
        Ok(json) => json,
        Err(rejection) => return ignore_malformed("/unsubscribe", rejection),
    };
    info!(message_id = message.id, chat_id = message.chat_id, "unsubscribe command");
    let result = state.registry.unsubscribe(&message).await.map(describe_command);
    acknowledge("/unsubscribe", result)
}

/// POST /ticket_status_change
pub async fn post_ticket_status_change(
    State(state): State<GatewayState>,
    payload: Result<Json<TicketStatusEvent>, JsonRejection>,
) -> Response {
    let Json(event) = match payload {
        Ok(json) => json,
        Err(rejection) => return ignore_malformed("/ticket_status_change", rejection),
    };
    info!(issue_key = %event.issue_key, status = %event.status, "ticket status changed");
    let result = state
        .registry
        .notify_status_change(&event)
        .await
        .map(describe_fanout);
    acknowledge("/ticket_status_change", result)
}

/// GET /health
///
/// Checks every wired adapter. Answers 503 when any of them is unhealthy.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let checks = join_all(state.health.adapters.iter().map(|a| a.health_check())).await;

    let mut unhealthy = false;
    let mut degraded = false;
    let adapters = state
        .health
        .adapters
        .iter()
        .zip(checks)
        .map(|(adapter, check)| {
            let (status, detail) = match check {
                Ok(HealthStatus::Healthy) => ("healthy", None),
                Ok(HealthStatus::Degraded(d)) => {
                    degraded = true;
                    ("degraded", Some(d))
                }
                Ok(HealthStatus::Unhealthy(d)) => {
                    unhealthy = true;
                    ("unhealthy", Some(d))
                }
                Err(e) => {
                    unhealthy = true;
                    ("unhealthy", Some(e.to_string()))
                }
            };
            AdapterHealth {
                name: adapter.name().to_string(),
                status,
                detail,
            }
        })
        .collect();

    let escalation = match state.health.poller.as_ref().map(|p| p.state()) {
        Some(PollerState::Idle) => "idle",
        Some(PollerState::Scanning) => "scanning",
        None => "disabled",
    };

    let body = HealthResponse {
        status: if unhealthy || degraded { "degraded" } else { "ok" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        escalation,
        adapters,
    };
    let code = if unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use tower::ServiceExt;
    use tutordesk_config::model::RolesConfig;
    use tutordesk_core::{MessageStore, PluginAdapter, SubscriptionStore};
    use tutordesk_engine::{Correlator, EventDispatcher, Resolver, RoleClassifier};
    use tutordesk_test_utils::{FlakyStore, MockDirectory, TestHarness, temp_storage};

    use crate::server::{HealthState, build_router};

    const STUDENT: i64 = 1;
    const EXPERT: i64 = 2;

    async fn harness() -> TestHarness {
        TestHarness::builder()
            .with_user(STUDENT, ["HardDE_4"])
            .with_user(EXPERT, ["expert"])
            .build()
            .await
            .unwrap()
    }

    fn router(h: &TestHarness) -> axum::Router {
        build_router(GatewayState {
            dispatcher: h.dispatcher.clone(),
            registry: h.registry.clone(),
            health: HealthState::new(
                vec![
                    h.storage.clone() as Arc<dyn PluginAdapter>,
                    h.chat.clone() as Arc<dyn PluginAdapter>,
                ],
                Some(h.poller.clone()),
            ),
        })
    }

    fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn message_webhook(id: i64, user: i64, parent: Option<i64>) -> serde_json::Value {
        serde_json::json!({
            "type": "message",
            "id": id,
            "event": "new",
            "entity_type": "discussion",
            "entity_id": 100,
            "content": "why does my DAG fail?",
            "user_id": user,
            "chat_id": 100,
            "created_at": Utc.with_ymd_and_hms(2025, 5, 7, 9, 0, 0).unwrap().to_rfc3339(),
            "parent_message_id": parent
        })
    }

    #[tokio::test]
    async fn student_message_then_expert_reply() {
        let h = harness().await;

        let resp = router(&h)
            .oneshot(post("/pachca/events", message_webhook(10, STUDENT, None)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["status"], "ok");
        assert!(body["detail"].as_str().unwrap().starts_with("opened group"));

        let resp = router(&h)
            .oneshot(post("/pachca/events", message_webhook(11, EXPERT, Some(10))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let row = h.storage.get_student_message(10).await.unwrap().unwrap();
        assert!(!row.is_pending());
        assert_eq!(row.reaction_message_id, Some(11));
    }

    #[tokio::test]
    async fn malformed_body_is_acknowledged() {
        let h = harness().await;
        let req = Request::post("/pachca/events")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = router(&h).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["status"], "ignored");
    }

    #[tokio::test]
    async fn unknown_user_is_acknowledged_as_failed() {
        let h = harness().await;
        let resp = router(&h)
            .oneshot(post("/pachca/events", message_webhook(10, 999, None)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["status"], "failed");
    }

    #[tokio::test]
    async fn storage_failure_answers_500() {
        let h = harness().await;
        let (storage, _dir) = temp_storage().await;
        let flaky = Arc::new(FlakyStore::new(storage));
        flaky.fail_messages(true);
        let dispatcher = EventDispatcher::new(
            RoleClassifier::new(&RolesConfig::default()).unwrap(),
            Arc::new(MockDirectory::new().with_user(STUDENT, ["HardDE_4"])),
            Correlator::new(flaky.clone(), Duration::from_secs(60)).unwrap(),
            Resolver::new(flaky),
        );
        let app = build_router(GatewayState {
            dispatcher: Arc::new(dispatcher),
            registry: h.registry.clone(),
            health: HealthState::new(vec![], None),
        });

        let resp = app
            .oneshot(post("/pachca/events", message_webhook(10, STUDENT, None)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn subscribe_and_status_change_routes() {
        let h = harness().await;
        let command = serde_json::json!({
            "id": 20,
            "event": "new",
            "content": "/subscribe BACKLOG-5",
            "user_id": STUDENT,
            "chat_id": 300,
            "created_at": "2025-05-07T09:00:00Z"
        });
        let resp = router(&h).oneshot(post("/subscribe", command)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(h.storage.find_subscription("BACKLOG-5", 300).await.unwrap().is_some());

        let resp = router(&h)
            .oneshot(post(
                "/ticket_status_change",
                serde_json::json!({"issue_key": "BACKLOG-5", "status": "Закрыт"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["detail"], "notified 1 of 1 thread(s)");

        let sent = h.chat.sent_messages().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].text, "Тикет BACKLOG-5 был переведён в статус Закрыт");
        assert_eq!(sent[1].parent_message_id, Some(20));
    }

    #[tokio::test]
    async fn unsubscribe_route() {
        let h = harness().await;
        let command = serde_json::json!({
            "id": 21,
            "event": "new",
            "content": "BACKLOG-5",
            "user_id": STUDENT,
            "chat_id": 300,
            "created_at": "2025-05-07T09:00:00Z"
        });
        let resp = router(&h).oneshot(post("/unsubscribe", command)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["detail"], "not subscribed to BACKLOG-5");
    }

    #[tokio::test]
    async fn health_lists_adapters() {
        let h = harness().await;
        let resp = router(&h)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["escalation"], "idle");
        assert_eq!(body["adapters"][0]["name"], "sqlite");
        assert_eq!(body["adapters"][1]["name"], "mock-chat");
    }

    #[test]
    fn ack_omits_empty_detail() {
        let json = serde_json::to_string(&AckResponse {
            status: "ok",
            detail: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"status":"ok"}"#);
    }
}
