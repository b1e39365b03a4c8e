//! Database connection management with pragma configuration.
//!
//! This module handles opening SQLite databases, applying required pragmas
//! for performance and concurrency (WAL mode), and running migrations.

use super::migrations::{self, Migrations};
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

/// Content cache handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread. Cloning shares the same connection.
#[derive(Clone, Debug)]
pub struct ContentCache {
    pub(crate) conn: Connection,
}

impl ContentCache {
    /// Open the content cache at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = open_connection(path, migrations::CONTENT).await?;
        Ok(Self { conn })
    }

    /// Open an in-memory content cache for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = open_in_memory_connection(migrations::CONTENT).await?;
        Ok(Self { conn })
    }

    /// Close the connection, flushing the WAL.
    ///
    /// Every clone shares the connection; their later calls fail.
    pub async fn close(self) -> Result<(), Error> {
        self.conn.close().await.map_err(Error::from)
    }
}

/// Open a file-backed connection, configure it and migrate it.
pub(crate) async fn open_connection(path: impl AsRef<Path>, migrations: Migrations) -> Result<Connection, Error> {
    let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
    configure(&conn, migrations).await?;
    Ok(conn)
}

/// Open an in-memory connection with the same configuration as file-based ones.
pub(crate) async fn open_in_memory_connection(migrations: Migrations) -> Result<Connection, Error> {
    let conn = Connection::open_in_memory()
        .await
        .map_err(|e| Error::Database(e.into()))?;
    configure(&conn, migrations).await?;
    Ok(conn)
}

async fn configure(conn: &Connection, migrations: Migrations) -> Result<(), Error> {
    conn.call(|conn| {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA temp_store=MEMORY;
             PRAGMA foreign_keys=ON;",
        )?;
        Ok(())
    })
    .await
    .map_err(Error::Database)?;

    migrations::run(conn, migrations).await
}
