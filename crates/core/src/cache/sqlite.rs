//! SQLite cache backend.
//!
//! Entries live in `cache_entries` with an absolute expiry in unix
//! milliseconds. Expired rows are filtered on read and removed by
//! [`Cache::purge_expired`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_rusqlite::{Connection, params, rusqlite};

use super::{Cache, Error};
use crate::db;

/// Cache database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread.
#[derive(Clone, Debug)]
pub struct CacheDb {
    conn: Connection,
}

impl CacheDb {
    /// Open a cache database at the specified path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = db::open(path, db::CACHE_MIGRATIONS).await.map_err(unavailable)?;
        Ok(Self { conn })
    }

    /// Open an in-memory cache database for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = db::open_in_memory(db::CACHE_MIGRATIONS).await.map_err(unavailable)?;
        Ok(Self { conn })
    }
}

fn unavailable(err: impl std::fmt::Display) -> Error {
    Error::CacheUnavailable(err.to_string())
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[async_trait]
impl Cache for CacheDb {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error> {
        let key = key.to_string();
        let value = value.to_string();
        let expires_at_ms = now_ms().saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX));

        self.conn
            .call(move |conn| -> rusqlite::Result<()> {
                conn.execute(
                    "INSERT INTO cache_entries (key, value, expires_at_ms) VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        expires_at_ms = excluded.expires_at_ms",
                    params![key, value, expires_at_ms],
                )?;
                Ok(())
            })
            .await
            .map_err(unavailable)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        let now = now_ms();

        self.conn
            .call(move |conn| -> rusqlite::Result<Option<String>> {
                let result = conn.query_row(
                    "SELECT value FROM cache_entries WHERE key = ?1 AND expires_at_ms > ?2",
                    params![key, now],
                    |row| row.get(0),
                );

                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(unavailable)
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> rusqlite::Result<()> {
                conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
                Ok(())
            })
            .await
            .map_err(unavailable)
    }

    async fn purge_expired(&self) -> Result<u64, Error> {
        let now = now_ms();
        self.conn
            .call(move |conn| -> rusqlite::Result<u64> {
                let count = conn.execute("DELETE FROM cache_entries WHERE expires_at_ms <= ?1", params![now])?;
                Ok(count as u64)
            })
            .await
            .map_err(unavailable)
    }
}
