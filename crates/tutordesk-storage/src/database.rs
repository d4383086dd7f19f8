// SPDX-FileCopyrightText: 2026 TutorDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! `Database` wraps exactly one connection and is the single writer: query
//! modules take `&Database` and go through [`Database::connection`]. Do NOT
//! open additional connections for writes.

use std::path::Path;

use tracing::{debug, info};
use tutordesk_core::TutorDeskError;

/// Handle to the TutorDesk SQLite database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, TutorDeskError> {
        Self::open_with(path, true).await
    }

    /// Open the database, choosing the journal mode explicitly.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, TutorDeskError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| TutorDeskError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| TutorDeskError::Storage {
                source: Box::new(e),
            })?;

        let journal = if wal_mode { "WAL" } else { "DELETE" };
        let migrated = conn
            .call(
                move |conn| -> Result<Result<(), TutorDeskError>, rusqlite::Error> {
                    let _mode: String =
                        conn.pragma_update_and_check(None, "journal_mode", journal, |row| {
                            row.get(0)
                        })?;
                    conn.execute_batch(
                        "PRAGMA synchronous = NORMAL;
                         PRAGMA foreign_keys = ON;",
                    )?;
                    conn.busy_timeout(std::time::Duration::from_secs(5))?;
                    Ok(crate::migrations::run_migrations(conn))
                },
            )
            .await
            .map_err(map_tr_err)?;
        migrated?;

        info!(path, journal, "database opened");
        Ok(Self { conn })
    }

    /// The single tokio-rusqlite connection every query goes through.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), TutorDeskError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(|e| TutorDeskError::Storage {
            source: Box::new(e),
        })?;
        debug!("database closed");
        Ok(())
    }
}

/// Map a tokio-rusqlite call error into the workspace error type.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TutorDeskError {
    TutorDeskError::Storage {
        source: Box::new(e),
    }
}
