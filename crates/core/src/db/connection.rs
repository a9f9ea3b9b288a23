//! Connection management with pragma configuration.
//!
//! Both the entity store and the SQLite cache backend open their
//! connections through here so they share pragmas and migration handling.

use super::migrations::{self, Migration};
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Open a database at the specified path and apply `schema`.
///
/// Creates the file if it doesn't exist, applies performance pragmas,
/// and runs any pending migrations.
pub async fn open(path: impl AsRef<Path>, schema: &'static [Migration]) -> Result<Connection, Error> {
    let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
    prepare(&conn, schema).await?;
    Ok(conn)
}

/// Open an in-memory database with the same configuration as file-based ones.
pub async fn open_in_memory(schema: &'static [Migration]) -> Result<Connection, Error> {
    let conn = Connection::open_in_memory()
        .await
        .map_err(|e| Error::Database(e.into()))?;
    prepare(&conn, schema).await?;
    Ok(conn)
}

async fn prepare(conn: &Connection, schema: &'static [Migration]) -> Result<(), Error> {
    conn.call(|conn| {
        conn.execute_batch(PRAGMAS)?;
        Ok(())
    })
    .await
    .map_err(Error::Database)?;

    migrations::run(conn, schema).await
}
