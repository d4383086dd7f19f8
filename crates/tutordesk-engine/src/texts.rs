// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing message texts and Pachca deep links.

use tutordesk_core::StudentMessage;

const PACHCA_APP_URL: &str = "https://app.pachca.com";

pub fn subscribed(issue_key: &str) -> String {
    format!("Я сообщу вам об изменении статуса тикета {issue_key}")
}

pub fn already_subscribed(issue_key: &str) -> String {
    format!("Тикет {issue_key} уже отслеживается в этом треде")
}

pub fn unsubscribed(issue_key: &str) -> String {
    format!("Тикет {issue_key} больше не отслеживается в этом треде")
}

pub fn not_subscribed(issue_key: &str) -> String {
    format!("Тикет {issue_key} не отслеживается в этом треде")
}

pub fn status_changed(issue_key: &str, status: &str) -> String {
    format!("Тикет {issue_key} был переведён в статус {status}")
}

/// Deep link to a student message, pointing into the thread sidebar when the
/// message was posted in a thread.
pub fn message_link(message: &StudentMessage) -> String {
    match message.thread_message_id {
        Some(thread) => format!(
            "{PACHCA_APP_URL}/chats?thread_message_id={thread}&sidebar_message={}",
            message.message_id
        ),
        None => format!(
            "{PACHCA_APP_URL}/chats/{}?message={}",
            message.chat_id, message.message_id
        ),
    }
}

/// Escalation digest for one course, one link per pending group.
pub fn escalation_digest<'a>(
    course: Option<&str>,
    messages: impl IntoIterator<Item = &'a StudentMessage>,
) -> String {
    let header = match course {
        Some(course) => format!("#{course}: сообщения ожидающие реакции:"),
        None => "Сообщения ожидающие реакции:".to_string(),
    };
    let links: Vec<String> = messages.into_iter().map(message_link).collect();
    format!("{header}\n\n{}", links.join("\n\n"))
}
