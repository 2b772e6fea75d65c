// SPDX-FileCopyrightText: 2026 Bellhop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All access goes through tokio-rusqlite's single background thread, so
//! writes are serialized without additional locking. Do not open extra
//! `Connection` instances against the same file for writes.

use bellhop_config::model::StorageConfig;
use bellhop_core::BellhopError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Convert a tokio_rusqlite error into `BellhopError::Storage`.
///
/// Also pins the `call` closure error type to `rusqlite::Error` at every
/// use site.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> BellhopError {
    BellhopError::Storage {
        source: Box::new(e),
    }
}

fn storage_err(e: rusqlite::Error) -> BellhopError {
    BellhopError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the Bellhop SQLite database.
///
/// Cheap to clone; all clones share the same background connection thread.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at the configured path, apply PRAGMAs,
    /// and run any pending migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, BellhopError> {
        if let Some(parent) = std::path::Path::new(&config.database_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| BellhopError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = Connection::open(&config.database_path)
            .await
            .map_err(storage_err)?;

        let wal = config.wal_mode;
        conn.call(move |conn| {
            if wal {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
        apply_migrations(&conn).await?;

        debug!(path = %config.database_path, wal = config.wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database with migrations applied. Test use only.
    pub async fn open_in_memory() -> Result<Self, BellhopError> {
        let conn = Connection::open_in_memory().await.map_err(storage_err)?;
        conn.call(|conn| {
            conn.pragma_update(None, "foreign_keys", "ON")?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
        apply_migrations(&conn).await?;
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and flush outstanding writes.
    ///
    /// Safe to call on shutdown even when WAL mode is disabled.
    pub async fn close(&self) -> Result<(), BellhopError> {
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

/// Run pending migrations on the connection's background thread.
///
/// The closure already fails with `BellhopError`, so only the transport
/// variants of the call error need wrapping.
async fn apply_migrations(conn: &Connection) -> Result<(), BellhopError> {
    conn.call(migrations::run_migrations)
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Error(e) => e,
            other => BellhopError::Storage {
                source: Box::new(other),
            },
        })
}
