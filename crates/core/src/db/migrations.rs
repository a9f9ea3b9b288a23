//! Database schema migrations.
//!
//! Uses a simple version table approach to track applied migrations.
//! Each migration is a SQL batch that transforms the schema.

use crate::Error;
use tokio_rusqlite::{Connection, params};

/// A schema migration: (version, SQL).
///
/// Versions are incrementing integers and must be listed in order.
/// All migrations are idempotent using CREATE IF NOT EXISTS.
pub type Migration = (i64, &'static str);

/// Schema of the entity store.
pub const STORE_MIGRATIONS: &[Migration] = &[(1, include_str!("../../migrations/store/001_contributors.sql"))];

/// Schema of the SQLite cache backend.
pub const CACHE_MIGRATIONS: &[Migration] = &[(1, include_str!("../../migrations/cache/001_cache_entries.sql"))];

/// Run any pending migrations from `schema`.
///
/// This creates the _migrations table if it doesn't exist, checks the
/// current version, and applies any migrations that haven't been run yet.
///
/// # Errors
///
/// Returns an error if a migration SQL fails to execute.
pub async fn run(conn: &Connection, schema: &'static [Migration]) -> Result<(), Error> {
    conn.call(move |conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(Error::from)?;

        let current: i64 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| {
                row.get(0)
            })
            .map_err(Error::from)?;

        for (version, sql) in schema {
            if *version > current {
                conn.execute_batch(sql)
                    .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                    params![version, chrono::Utc::now().to_rfc3339()],
                )
                .map_err(Error::from)?;
                tracing::debug!(version, "applied migration");
            }
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
