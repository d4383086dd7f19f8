// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Pachca shared API.
//!
//! Handles bearer authentication, request timeouts, and a single retry on
//! transient responses (429, 500, 502, 503).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use tutordesk_config::model::PachcaConfig;
use tutordesk_core::{
    AdapterType, ChatSink, ChatUser, HealthStatus, PluginAdapter, TutorDeskError, UserDirectory,
};

use crate::types::{
    ApiErrorResponse, CreatedMessage, DataEnvelope, OutgoingMessage, SendMessageRequest, UserRecord,
};

const MAX_RETRIES: u32 = 1;

/// Pachca API client implementing [`ChatSink`] and [`UserDirectory`].
#[derive(Debug, Clone)]
pub struct PachcaClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    retry_delay: Duration,
}

impl PachcaClient {
    /// Creates a client from `[pachca]` settings.
    ///
    /// Requires `pachca.token` to be set.
    pub fn new(config: &PachcaConfig) -> Result<Self, TutorDeskError> {
        let token = config
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TutorDeskError::Config("pachca.token is required".into()))?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| TutorDeskError::Config(format!("invalid pachca.token header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let timeout = Duration::from_secs(config.request_timeout_secs);
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| TutorDeskError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            timeout,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Overrides the pause before retrying a transient failure.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Post a message into `chat_id`, threaded under `parent_message_id` if given.
    ///
    /// Returns the id Pachca assigned to the new message.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parent_message_id: Option<i64>,
    ) -> Result<i64, TutorDeskError> {
        let body = SendMessageRequest {
            message: OutgoingMessage {
                entity_id: chat_id,
                content: text,
                parent_message_id,
            },
        };
        let url = format!("{}/messages", self.base_url);
        let created: DataEnvelope<CreatedMessage> = self
            .execute("send message", || self.client.post(&url).json(&body))
            .await?;
        info!(chat_id, message_id = created.data.id, "pachca message sent");
        Ok(created.data.id)
    }

    /// Fetch a user record with its tags.
    pub async fn get_user(&self, user_id: i64) -> Result<ChatUser, TutorDeskError> {
        let url = format!("{}/users/{user_id}", self.base_url);
        let user: DataEnvelope<UserRecord> =
            self.execute("get user", || self.client.get(&url)).await?;
        debug!(user_id, tags = ?user.data.list_tags, "pachca user fetched");
        Ok(ChatUser::new(user.data.id, user.data.list_tags))
    }

    async fn execute<T, F>(&self, what: &str, build: F) -> Result<T, TutorDeskError>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                warn!(attempt, what, "retrying pachca request after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = build().send().await.map_err(|e| self.transport_error(what, e))?;
            let status = response.status();
            debug!(status = %status, attempt, what, "pachca response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| self.transport_error(what, e))?;
                return serde_json::from_str(&body).map_err(|e| TutorDeskError::Channel {
                    message: format!("pachca {what}: failed to parse response: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            let body = response.text().await.unwrap_or_default();
            let err = api_error(what, status, &body);
            if is_transient_error(status) && attempt < MAX_RETRIES {
                warn!(status = %status, body = %body, "transient pachca error, will retry");
                last_error = Some(err);
                continue;
            }
            return Err(err);
        }

        Err(last_error
            .unwrap_or_else(|| TutorDeskError::channel(format!("pachca {what} failed after retries"))))
    }

    fn transport_error(&self, what: &str, e: reqwest::Error) -> TutorDeskError {
        if e.is_timeout() {
            return TutorDeskError::Timeout {
                duration: self.timeout,
            };
        }
        TutorDeskError::Channel {
            message: format!("pachca {what}: HTTP request failed: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

fn api_error(what: &str, status: StatusCode, body: &str) -> TutorDeskError {
    let message = match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => {
            format!("pachca {what} returned {status}: {}", parsed.summary())
        }
        _ => format!("pachca {what} returned {status}: {body}"),
    };
    TutorDeskError::channel(message)
}

/// Returns true for HTTP status codes that indicate a transient error.
fn is_transient_error(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}

#[async_trait]
impl PluginAdapter for PachcaClient {
    fn name(&self) -> &str {
        "pachca"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Chat
    }

    async fn health_check(&self) -> Result<HealthStatus, TutorDeskError> {
        let url = format!("{}/profile", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(resp) => Ok(HealthStatus::Degraded(format!(
                "pachca profile returned {}",
                resp.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("pachca unreachable: {e}"))),
        }
    }
}

#[async_trait]
impl ChatSink for PachcaClient {
    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        parent_message_id: Option<i64>,
    ) -> Result<(), TutorDeskError> {
        self.send_message(chat_id, text, parent_message_id).await.map(|_| ())
    }
}

#[async_trait]
impl UserDirectory for PachcaClient {
    async fn get_user(&self, user_id: i64) -> Result<ChatUser, TutorDeskError> {
        self.get_user(user_id).await
    }
}
