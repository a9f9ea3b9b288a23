//! Core types and shared functionality for the contributors service.
//!
//! This crate provides:
//! - Contributor model and SQLite entity store
//! - Cache backends (in-process and SQLite) with TTL expiry
//! - Cache-aside coordinator with background population and invalidation
//! - Change notifications for committed writes
//! - Unified error types and configuration

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod notify;
pub mod service;
pub mod store;

pub use cache::{Cache, CacheDb, MemoryCache};
pub use config::{AppConfig, CacheBackend, ConfigError};
pub use error::Error;
pub use model::{Contributor, ContributorId, ContributorInput};
pub use notify::{ChangeNotifier, ContributorEvent, Subscription};
pub use service::{ContributorService, ServiceConfig};
pub use store::{ContributorStore, StoreDb};
