// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Student message operations: grouped insert, deletion, group resolution,
//! and the SLA scan.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use tutordesk_core::TutorDeskError;
use tutordesk_core::types::{
    GroupAssignment, GroupId, GroupLookup, NewStudentMessage, Resolution, ResolvedGroup,
    StudentMessage,
};

use super::{decode_opt_ts, decode_ts, encode_ts};
use crate::database::Database;

const COLUMNS: &str = "message_id, message_group_id, user_id, chat_id, thread_message_id,
     thread_chat_id, text, sent_at, received_reaction, received_reaction_at,
     reaction_message_id, course, created_at";

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<StudentMessage> {
    Ok(StudentMessage {
        message_id: row.get(0)?,
        message_group_id: GroupId(row.get(1)?),
        user_id: row.get(2)?,
        chat_id: row.get(3)?,
        thread_message_id: row.get(4)?,
        thread_chat_id: row.get(5)?,
        text: row.get(6)?,
        sent_at: decode_ts(row, 7)?,
        received_reaction: row.get(8)?,
        received_reaction_at: decode_opt_ts(row, 9)?,
        reaction_message_id: row.get(10)?,
        course: row.get(11)?,
        created_at: decode_ts(row, 12)?,
    })
}

/// Record a pending message, choosing its group inside one transaction.
///
/// An existing row with the same `message_id` is left untouched and reported
/// as [`GroupAssignment::Duplicate`].
pub async fn record(
    db: &Database,
    message: NewStudentMessage,
    lookup: GroupLookup,
    fallback: GroupId,
) -> Result<GroupAssignment, TutorDeskError> {
    db.connection()
        .call(move |conn| -> Result<GroupAssignment, rusqlite::Error> {
            let tx = conn.transaction()?;

            let existing: Option<String> = tx
                .query_row(
                    "SELECT message_group_id FROM student_messages WHERE message_id = ?1",
                    params![message.message_id],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(group) = existing {
                tx.commit()?;
                return Ok(GroupAssignment::Duplicate(GroupId(group)));
            }

            let candidate: Option<String> = tx
                .query_row(
                    "SELECT message_group_id FROM student_messages
                     WHERE user_id = ?1
                       AND received_reaction = 0
                       AND sent_at >= ?2 AND sent_at <= ?3
                       AND (chat_id = ?4 OR (?5 IS NOT NULL AND thread_message_id = ?5))
                     ORDER BY sent_at DESC, created_at DESC
                     LIMIT 1",
                    params![
                        lookup.user_id,
                        encode_ts(&lookup.window_start),
                        encode_ts(&lookup.window_end),
                        lookup.chat_id,
                        lookup.thread_message_id,
                    ],
                    |row| row.get(0),
                )
                .optional()?;

            let assignment = match candidate {
                Some(group) => GroupAssignment::Joined(GroupId(group)),
                None => GroupAssignment::Opened(fallback),
            };

            tx.execute(
                "INSERT INTO student_messages (message_id, message_group_id, user_id, chat_id,
                     thread_message_id, thread_chat_id, text, sent_at, received_reaction,
                     received_reaction_at, reaction_message_id, course, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, NULL, NULL, ?9, ?10)",
                params![
                    message.message_id,
                    assignment.group_id().as_str(),
                    message.user_id,
                    message.chat_id,
                    message.thread_message_id,
                    message.thread_chat_id,
                    message.text,
                    encode_ts(&message.sent_at),
                    message.course,
                    encode_ts(&message.created_at),
                ],
            )?;
            tx.commit()?;
            Ok(assignment)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a message row. Returns whether a row was removed.
pub async fn delete(db: &Database, message_id: i64) -> Result<bool, TutorDeskError> {
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "DELETE FROM student_messages WHERE message_id = ?1",
                params![message_id],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Resolve every pending row in the group of the pending target message.
///
/// Already resolved rows keep their original reaction fields.
pub async fn resolve_group(
    db: &Database,
    target_message_id: i64,
    resolution: Resolution,
) -> Result<Option<ResolvedGroup>, TutorDeskError> {
    db.connection()
        .call(move |conn| -> Result<Option<ResolvedGroup>, rusqlite::Error> {
            let tx = conn.transaction()?;

            let group: Option<String> = tx
                .query_row(
                    "SELECT message_group_id FROM student_messages
                     WHERE message_id = ?1 AND received_reaction = 0",
                    params![target_message_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(group) = group else {
                tx.commit()?;
                return Ok(None);
            };

            let rows = tx.execute(
                "UPDATE student_messages
                 SET received_reaction = 1, received_reaction_at = ?2, reaction_message_id = ?3
                 WHERE message_group_id = ?1 AND received_reaction = 0",
                params![
                    group,
                    encode_ts(&resolution.resolved_at),
                    resolution.reaction_message_id,
                ],
            )?;
            tx.commit()?;
            Ok(Some(ResolvedGroup {
                group_id: GroupId(group),
                rows,
            }))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Pending messages sent at or before `cutoff`, oldest first.
pub async fn pending_sent_before(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<Vec<StudentMessage>, TutorDeskError> {
    let cutoff = encode_ts(&cutoff);
    db.connection()
        .call(move |conn| -> Result<Vec<StudentMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM student_messages
                 WHERE received_reaction = 0 AND sent_at <= ?1
                 ORDER BY created_at ASC, message_id ASC"
            ))?;
            let rows = stmt.query_map(params![cutoff], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get(db: &Database, message_id: i64) -> Result<Option<StudentMessage>, TutorDeskError> {
    db.connection()
        .call(move |conn| -> Result<Option<StudentMessage>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM student_messages WHERE message_id = ?1"),
                params![message_id],
                row_to_message,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All rows of a group, oldest first.
pub async fn group_members(
    db: &Database,
    group_id: &GroupId,
) -> Result<Vec<StudentMessage>, TutorDeskError> {
    let group = group_id.0.clone();
    db.connection()
        .call(move |conn| -> Result<Vec<StudentMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM student_messages
                 WHERE message_group_id = ?1
                 ORDER BY created_at ASC, message_id ASC"
            ))?;
            let rows = stmt.query_map(params![group], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
