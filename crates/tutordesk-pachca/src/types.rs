// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and response bodies of the Pachca shared API.

use serde::{Deserialize, Serialize};

/// Body of `POST /messages`.
#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub message: OutgoingMessage<'a>,
}

#[derive(Debug, Serialize)]
pub struct OutgoingMessage<'a> {
    /// Chat the message is posted into.
    pub entity_id: i64,
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_message_id: Option<i64>,
}

/// Every successful Pachca response wraps its payload in `data`.
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct CreatedMessage {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    #[serde(default)]
    pub list_tags: Vec<String>,
}

/// Error body returned on 4xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl ApiErrorResponse {
    /// `key: value` pairs joined for logging.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| {
                format!(
                    "{}: {}",
                    e.key.as_deref().unwrap_or("error"),
                    e.value.as_deref().unwrap_or("unknown")
                )
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}
