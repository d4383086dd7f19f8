// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket subscription operations keyed by `(issue_key, chat_id)`.

use rusqlite::{OptionalExtension, params};
use tutordesk_core::TutorDeskError;
use tutordesk_core::types::ThreadSubscription;

use super::{decode_ts, encode_ts};
use crate::database::Database;

fn row_to_subscription(row: &rusqlite::Row<'_>) -> rusqlite::Result<ThreadSubscription> {
    Ok(ThreadSubscription {
        issue_key: row.get(0)?,
        chat_id: row.get(1)?,
        message_id: row.get(2)?,
        created_at: decode_ts(row, 3)?,
    })
}

pub async fn find(
    db: &Database,
    issue_key: &str,
    chat_id: i64,
) -> Result<Option<ThreadSubscription>, TutorDeskError> {
    let issue_key = issue_key.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ThreadSubscription>, rusqlite::Error> {
            conn.query_row(
                "SELECT issue_key, chat_id, message_id, created_at
                 FROM thread_subscriptions WHERE issue_key = ?1 AND chat_id = ?2",
                params![issue_key, chat_id],
                row_to_subscription,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert a subscription unless the pair already exists.
///
/// Returns `false` when a row for `(issue_key, chat_id)` was already present.
pub async fn insert(db: &Database, sub: &ThreadSubscription) -> Result<bool, TutorDeskError> {
    let sub = sub.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "INSERT INTO thread_subscriptions (issue_key, chat_id, message_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (issue_key, chat_id) DO NOTHING",
                params![
                    sub.issue_key,
                    sub.chat_id,
                    sub.message_id,
                    encode_ts(&sub.created_at)
                ],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a subscription and return the removed row.
pub async fn delete(
    db: &Database,
    issue_key: &str,
    chat_id: i64,
) -> Result<Option<ThreadSubscription>, TutorDeskError> {
    let issue_key = issue_key.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ThreadSubscription>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let existing = tx
                .query_row(
                    "SELECT issue_key, chat_id, message_id, created_at
                     FROM thread_subscriptions WHERE issue_key = ?1 AND chat_id = ?2",
                    params![issue_key, chat_id],
                    row_to_subscription,
                )
                .optional()?;
            if existing.is_some() {
                tx.execute(
                    "DELETE FROM thread_subscriptions WHERE issue_key = ?1 AND chat_id = ?2",
                    params![issue_key, chat_id],
                )?;
            }
            tx.commit()?;
            Ok(existing)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Every thread subscribed to `issue_key`, oldest subscription first.
pub async fn for_issue(
    db: &Database,
    issue_key: &str,
) -> Result<Vec<ThreadSubscription>, TutorDeskError> {
    let issue_key = issue_key.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<ThreadSubscription>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT issue_key, chat_id, message_id, created_at
                 FROM thread_subscriptions WHERE issue_key = ?1
                 ORDER BY created_at ASC, chat_id ASC",
            )?;
            let rows = stmt.query_map(params![issue_key], row_to_subscription)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn sub(key: &str, chat_id: i64, message_id: i64) -> ThreadSubscription {
        ThreadSubscription {
            issue_key: key.into(),
            chat_id,
            message_id,
            created_at: Utc.with_ymd_and_hms(2025, 5, 7, 9, 0, 0).unwrap()
                + chrono::Duration::seconds(chat_id),
        }
    }

    #[tokio::test]
    async fn insert_is_unique_per_pair() {
        let (db, _dir) = setup_db().await;

        assert!(insert(&db, &sub("BACKLOG-1", 10, 100)).await.unwrap());
        assert!(!insert(&db, &sub("BACKLOG-1", 10, 101)).await.unwrap());
        assert!(insert(&db, &sub("BACKLOG-1", 11, 102)).await.unwrap());

        let found = find(&db, "BACKLOG-1", 10).await.unwrap().unwrap();
        assert_eq!(found.message_id, 100, "first subscription wins");

        let all = for_issue(&db, "BACKLOG-1").await.unwrap();
        assert_eq!(
            all.iter().map(|s| s.chat_id).collect::<Vec<_>>(),
            vec![10, 11]
        );
    }

    #[tokio::test]
    async fn delete_returns_removed_row() {
        let (db, _dir) = setup_db().await;
        let original = sub("BACKLOG-2", 10, 100);
        insert(&db, &original).await.unwrap();

        let removed = delete(&db, "BACKLOG-2", 10).await.unwrap();
        assert_eq!(removed, Some(original));
        assert!(delete(&db, "BACKLOG-2", 10).await.unwrap().is_none());
        assert!(find(&db, "BACKLOG-2", 10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn other_issues_are_not_listed() {
        let (db, _dir) = setup_db().await;
        insert(&db, &sub("BACKLOG-3", 10, 100)).await.unwrap();
        insert(&db, &sub("BACKLOG-4", 10, 100)).await.unwrap();

        assert_eq!(for_issue(&db, "BACKLOG-3").await.unwrap().len(), 1);
        assert!(for_issue(&db, "BACKLOG-5").await.unwrap().is_empty());
    }
}
