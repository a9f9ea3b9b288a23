//! Contributor MCP tools.
//!
//! Thin adapters over [`ContributorService`](contributors_core::ContributorService):
//! parameters are decoded, the core operation runs, and its result is
//! rendered as pretty JSON.

pub mod read;
pub mod watch;
pub mod write;

pub use read::{
    ContributorGetByUsernameParams, ContributorGetParams, ContributorListParams, get_by_username_impl, get_impl,
    list_impl,
};
pub use watch::{AwaitUpdateParams, await_update_impl};
pub use write::{
    ContributorCreateParams, ContributorDeleteParams, ContributorUpdateParams, create_impl, delete_impl, update_impl,
};
