//! Ephemeral key/value cache with per-key TTL.
//!
//! The cache is an accelerator only. Payloads are opaque text; the
//! coordinator owns encoding. Two backends are provided:
//!
//! - [`MemoryCache`]: process-local map, lazily expired
//! - [`CacheDb`]: SQLite table, shareable between processes via a file

pub mod keys;
pub mod memory;
pub mod sqlite;

use std::time::Duration;

use async_trait::async_trait;

pub use crate::Error;

pub use memory::MemoryCache;
pub use sqlite::CacheDb;

/// Contract of an ephemeral cache.
///
/// Operations on different keys are independent; there are no transactions.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Store `value` under `key`, expiring `ttl` from now.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error>;

    /// Fetch a live value. Expired entries read as `None`.
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), Error>;

    /// Drop expired entries, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64, Error>;
}
