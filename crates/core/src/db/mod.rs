//! SQLite plumbing shared by the entity store and the SQLite cache.
//!
//! Access is async via tokio-rusqlite, which runs every call on a
//! dedicated connection thread. Calls on one connection are serialized.

pub mod connection;
pub mod migrations;

pub use connection::{open, open_in_memory};
pub use migrations::{CACHE_MIGRATIONS, Migration, STORE_MIGRATIONS};
