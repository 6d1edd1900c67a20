//! Database connection management with pragma configuration.
//!
//! Opens the SQLite database, applies pragmas (WAL mode, foreign keys) and
//! runs migrations before the handle is handed out.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Booking store handle.
///
/// Wraps a tokio-rusqlite Connection, which owns a single background thread
/// that executes every statement in submission order. Cloning is cheap and
/// shares that thread.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
}

impl CacheDb {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let conn = Connection::open(path).await.map_err(|e| Error::Store(e.into()))?;
        let db = Self::configure(conn).await?;
        tracing::debug!(path = %path.display(), "opened booking store");
        Ok(db)
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Store(e.into()))?;
        Self::configure(conn).await
    }

    async fn configure(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Store)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}
