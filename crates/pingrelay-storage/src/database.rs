// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management.
//!
//! All SQLite access goes through a single [`tokio_rusqlite::Connection`],
//! which serializes queries onto one background thread. WAL mode keeps
//! readers from blocking the writer.

use std::path::Path;

use pingrelay_core::PingRelayError;
use tracing::debug;

/// Converts a tokio-rusqlite error into the crate error type.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> PingRelayError {
    PingRelayError::Storage {
        source: Box::new(e),
    }
}

/// Errors raised while setting up a freshly opened connection.
#[derive(Debug, thiserror::Error)]
enum SetupError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Migration(#[from] refinery::Error),
}

/// Handle to the SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if necessary) the database at `path`, applies
    /// pragmas, and runs pending migrations.
    pub async fn open(path: &str) -> Result<Self, PingRelayError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| PingRelayError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| PingRelayError::Storage {
                source: Box::new(e),
            })?;

        conn.call(|conn| -> Result<(), SetupError> {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            crate::migrations::run(conn)?;
            Ok(())
        })
        .await
        .map_err(|e| PingRelayError::Storage {
            source: Box::new(e),
        })?;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// Returns the underlying connection for query modules.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL before shutdown.
    pub async fn close(&self) -> Result<(), PingRelayError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
