// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and migrations.
//!
//! All statements are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use std::time::Duration;

use cortex_core::CortexError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Convert any tokio-rusqlite error into [`CortexError::Storage`].
pub(crate) fn map_tr_err<E>(e: E) -> CortexError
where
    E: std::error::Error + Send + Sync + 'static,
{
    CortexError::storage(e)
}

/// A single-writer SQLite handle with migrations applied.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` and runs migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, CortexError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(CortexError::storage)?;
            }
        }
        let conn = Connection::open(path).await.map_err(map_tr_err)?;
        Self::prepare(conn, wal_mode).await
    }

    /// Opens a private in-memory database (tests and ephemeral hosts).
    pub async fn open_in_memory() -> Result<Self, CortexError> {
        let conn = Connection::open_in_memory().await.map_err(map_tr_err)?;
        Self::prepare(conn, false).await
    }

    async fn prepare(conn: Connection, wal_mode: bool) -> Result<Self, CortexError> {
        conn.call(move |conn| -> Result<Result<(), CortexError>, rusqlite::Error> {
            conn.busy_timeout(Duration::from_secs(5))?;
            if wal_mode {
                let mode: String = conn.pragma_update_and_check(
                    None,
                    "journal_mode",
                    "WAL",
                    |row| row.get(0),
                )?;
                debug!(journal_mode = %mode, "journal mode set");
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            Ok(migrations::run_migrations(conn))
        })
        .await
        .map_err(map_tr_err)??;

        Ok(Self { conn })
    }

    /// Returns the underlying connection for query modules.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
