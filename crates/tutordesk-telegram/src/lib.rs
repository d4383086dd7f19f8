// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram escalation channel for TutorDesk.
//!
//! Implements [`EscalationSink`] over the Telegram Bot API via teloxide.
//! Digests are sent as plain text; texts longer than one Telegram message
//! are split on link boundaries.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use tracing::{debug, info};
use tutordesk_config::model::TelegramConfig;
use tutordesk_core::{AdapterType, EscalationSink, HealthStatus, PluginAdapter, TutorDeskError};

/// Telegram's limit on the text of one message, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 4096;

pub struct TelegramEscalation {
    bot: Bot,
}

impl TelegramEscalation {
    /// Creates the sink. Requires `telegram.bot_token` to be set.
    pub fn new(config: &TelegramConfig) -> Result<Self, TutorDeskError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            TutorDeskError::Config("telegram.bot_token is required for escalations".into())
        })?;
        if token.is_empty() {
            return Err(TutorDeskError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }
        Ok(Self {
            bot: Bot::new(token),
        })
    }

    /// Points the bot at a different Bot API server.
    pub fn with_api_url(mut self, url: reqwest::Url) -> Self {
        self.bot = self.bot.set_api_url(url);
        self
    }
}

#[async_trait]
impl PluginAdapter for TelegramEscalation {
    fn name(&self) -> &str {
        "telegram"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Escalation
    }

    async fn health_check(&self) -> Result<HealthStatus, TutorDeskError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }
}

#[async_trait]
impl EscalationSink for TelegramEscalation {
    async fn send(&self, channel_id: i64, text: &str) -> Result<(), TutorDeskError> {
        let parts = split_message(text, MAX_MESSAGE_LENGTH);
        let count = parts.len();
        for (i, part) in parts.into_iter().enumerate() {
            self.bot
                .send_message(ChatId(channel_id), part)
                .await
                .map_err(|e| TutorDeskError::Channel {
                    message: format!("failed to send escalation: {e}"),
                    source: Some(Box::new(e)),
                })?;
            debug!(channel_id, part = i + 1, count, "escalation part sent");
        }
        info!(channel_id, parts = count, "escalation sent to telegram");
        Ok(())
    }
}

/// Split `text` into chunks of at most `limit` characters.
///
/// Cuts prefer paragraph breaks, then line breaks; a single overlong line
/// is cut at the character limit.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    for paragraph in text.split("\n\n") {
        let candidate_len = if current.is_empty() {
            paragraph.chars().count()
        } else {
            current.chars().count() + 2 + paragraph.chars().count()
        };
        if candidate_len <= limit {
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
            continue;
        }
        if !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        if paragraph.chars().count() <= limit {
            current.push_str(paragraph);
        } else {
            let chars: Vec<char> = paragraph.chars().collect();
            for chunk in chars.chunks(limit) {
                parts.push(chunk.iter().collect());
            }
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}
