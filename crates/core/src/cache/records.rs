//! Structured record store for decoded JSON payloads.
//!
//! Independent of the content cache and strictly best-effort: every storage
//! failure is logged and reported as [`Lookup::Absent`] or
//! [`WriteOutcome::Dropped`], never as an error. The database is opened
//! lazily on first use and the handle is reused afterwards.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tokio_rusqlite::{Connection, params, rusqlite};

use super::connection::{open_connection, open_in_memory_connection};
use super::migrations;
use crate::Error;

/// A captured data-endpoint payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub data: serde_json::Value,
    /// Capture time in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl StoredRecord {
    /// Record `data` as captured now.
    pub fn captured(data: serde_json::Value) -> Self {
        Self { data, timestamp: chrono::Utc::now().timestamp_millis() }
    }
}

/// Result of a best-effort read.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    Absent,
}

impl<T> Lookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Absent => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// Result of a best-effort write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Dropped,
}

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Lazily opened key/value store of [`StoredRecord`]s.
#[derive(Debug, Clone)]
pub struct RecordStore {
    location: Location,
    conn: Arc<OnceCell<Connection>>,
}

impl RecordStore {
    /// A store backed by the SQLite file at `path`. Nothing is opened yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { location: Location::File(path.into()), conn: Arc::new(OnceCell::new()) }
    }

    /// A store backed by a private in-memory database.
    pub fn in_memory() -> Self {
        Self { location: Location::Memory, conn: Arc::new(OnceCell::new()) }
    }

    async fn connection(&self) -> Result<&Connection, Error> {
        self.conn
            .get_or_try_init(|| async {
                tracing::debug!(location = ?self.location, "opening record store");
                match &self.location {
                    Location::File(path) => open_connection(path, migrations::RECORDS).await,
                    Location::Memory => open_in_memory_connection(migrations::RECORDS).await,
                }
            })
            .await
    }

    /// Store `record` under `key`, replacing any previous record.
    pub async fn put(&self, key: &str, record: &StoredRecord) -> WriteOutcome {
        match self.try_put(key, record).await {
            Ok(()) => WriteOutcome::Written,
            Err(e) => {
                tracing::warn!(key, error = %e, "record store write dropped");
                WriteOutcome::Dropped
            }
        }
    }

    /// Read the record stored under `key`.
    pub async fn get(&self, key: &str) -> Lookup<StoredRecord> {
        match self.try_get(key).await {
            Ok(Some(record)) => Lookup::Found(record),
            Ok(None) => Lookup::Absent,
            Err(e) => {
                tracing::warn!(key, error = %e, "record store read failed, treating as absent");
                Lookup::Absent
            }
        }
    }

    /// Remove every record. Returns how many were removed, 0 on failure.
    pub async fn clear(&self) -> u64 {
        match self.try_clear().await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "record store clear failed");
                0
            }
        }
    }

    async fn try_put(&self, key: &str, record: &StoredRecord) -> Result<(), Error> {
        let key = key.to_string();
        let data_json = serde_json::to_string(&record.data)?;
        let timestamp = record.timestamp;
        self.connection()
            .await?
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO records (key, data_json, timestamp) VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        data_json = excluded.data_json,
                        timestamp = excluded.timestamp",
                    params![key, data_json, timestamp],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn try_get(&self, key: &str) -> Result<Option<StoredRecord>, Error> {
        let key = key.to_string();
        self.connection()
            .await?
            .call(move |conn| -> Result<Option<StoredRecord>, Error> {
                let result = conn.query_row(
                    "SELECT data_json, timestamp FROM records WHERE key = ?1",
                    params![key],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                );

                match result {
                    Ok((data_json, timestamp)) => {
                        let data = serde_json::from_str(&data_json)?;
                        Ok(Some(StoredRecord { data, timestamp }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn try_clear(&self) -> Result<u64, Error> {
        self.connection()
            .await?
            .call(|conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM records", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
