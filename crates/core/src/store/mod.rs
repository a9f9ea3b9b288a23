//! Entity store: the durable, authoritative home of contributor records.
//!
//! The coordinator only talks to the store through [`ContributorStore`],
//! so tests can wrap or replace the SQLite implementation.

pub mod sqlite;

use async_trait::async_trait;

use crate::Error;
use crate::model::{Contributor, ContributorId, ContributorInput};

pub use sqlite::StoreDb;

/// CRUD contract of the entity store.
///
/// Every operation is a suspension point but completes before returning;
/// callers see a blocking-call contract.
#[async_trait]
pub trait ContributorStore: Send + Sync {
    /// Insert a new contributor, assigning its id and timestamps.
    ///
    /// Fails with [`Error::DuplicateKey`] when username or email is taken.
    async fn create(&self, input: &ContributorInput) -> Result<Contributor, Error>;

    async fn get_by_id(&self, id: &ContributorId) -> Result<Contributor, Error>;

    async fn get_by_username(&self, username: &str) -> Result<Contributor, Error>;

    /// Replace every mutable field and refresh `updated_at`, returning the
    /// post-update record in the same atomic step.
    async fn update(&self, id: &ContributorId, input: &ContributorInput) -> Result<Contributor, Error>;

    /// Hard-delete a contributor, returning the removed record.
    async fn delete(&self, id: &ContributorId) -> Result<Contributor, Error>;

    /// Page through contributors, newest `joined_at` first.
    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<Contributor>, Error>;
}
