//! Cache-aside coordinator for contributor records.
//!
//! Reads consult the cache first and fall back to the store on any miss,
//! decode failure or cache error. Writes go to the store synchronously and
//! then invalidate (or warm) the cache in the background. The store is
//! always authoritative: no cache failure changes the outcome of an
//! operation.

mod index;
mod tasks;


use std::sync::Arc;
use std::time::Duration;

pub use index::{Invalidation, KeyIndex};
pub use tasks::BackgroundTasks;

use crate::cache::{Cache, keys};
use crate::config::AppConfig;
use crate::model::{Contributor, ContributorId, ContributorInput};
use crate::notify::{ChangeNotifier, ContributorEvent, Subscription};
use crate::store::ContributorStore;
use crate::Error;

/// Tuning for the coordinator.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Lifetime of populated cache entries.
    pub cache_ttl: Duration,
    /// Bound on each cache read and each background cache job.
    pub cache_timeout: Duration,
    pub max_background_tasks: usize,
    pub default_list_limit: u32,
    pub max_list_limit: u32,
    pub event_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3600),
            cache_timeout: Duration::from_secs(5),
            max_background_tasks: 256,
            default_list_limit: 10,
            max_list_limit: 100,
            event_capacity: 64,
        }
    }
}

impl From<&AppConfig> for ServiceConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            cache_ttl: config.cache_ttl(),
            cache_timeout: config.cache_timeout(),
            max_background_tasks: config.max_background_tasks,
            default_list_limit: config.default_list_limit,
            max_list_limit: config.max_list_limit,
            event_capacity: config.event_capacity,
        }
    }
}

/// Outcome of a cache lookup on the read path.
enum Cached {
    Hit(Contributor),
    Miss,
    /// An entry was present but unusable (undecodable or for another record).
    Unusable,
}

/// Coordinates the store, the cache and change notifications.
///
/// Cheap to clone; clones share the same store, cache and background runner.
#[derive(Clone)]
pub struct ContributorService {
    store: Arc<dyn ContributorStore>,
    cache: Arc<dyn Cache>,
    tasks: BackgroundTasks,
    index: Arc<KeyIndex>,
    notifier: ChangeNotifier,
    config: ServiceConfig,
}

impl std::fmt::Debug for ContributorService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContributorService")
            .field("tasks", &self.tasks)
            .field("index", &self.index)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ContributorService {
    pub fn new(store: Arc<dyn ContributorStore>, cache: Arc<dyn Cache>, config: ServiceConfig) -> Self {
        Self {
            store,
            cache,
            tasks: BackgroundTasks::new(config.max_background_tasks, config.cache_timeout),
            index: Arc::new(KeyIndex::new()),
            notifier: ChangeNotifier::new(config.event_capacity),
            config,
        }
    }

    /// Create a contributor and warm its id key.
    pub async fn create(&self, input: ContributorInput) -> Result<Contributor, Error> {
        let input = input.validated()?;
        let seen = self.index.sequence();
        let contributor = self.store.create(&input).await?;

        tracing::debug!(id = %contributor.id, username = %contributor.username, "contributor created");
        self.schedule_populate(keys::by_id(contributor.id.as_str()), &contributor, seen);
        self.notifier.publish(ContributorEvent::Created { contributor: contributor.clone() });

        Ok(contributor)
    }

    /// Fetch a contributor by id, reading through the cache.
    pub async fn get(&self, id: &str) -> Result<Contributor, Error> {
        let id = ContributorId::parse(id)?;
        let key = keys::by_id(id.as_str());

        let cached = self.read_cached(&key, |c| c.id == id).await;
        if let Cached::Hit(contributor) = cached {
            return Ok(contributor);
        }

        let seen = self.index.sequence();
        let result = self.store.get_by_id(&id).await;
        self.after_store_read(key, cached, result, seen)
    }

    /// Fetch a contributor by username, reading through the cache.
    pub async fn get_by_username(&self, username: &str) -> Result<Contributor, Error> {
        let key = keys::by_username(username);

        let cached = self.read_cached(&key, |c| c.username == username).await;
        if let Cached::Hit(contributor) = cached {
            return Ok(contributor);
        }

        let seen = self.index.sequence();
        let result = self.store.get_by_username(username).await;
        self.after_store_read(key, cached, result, seen)
    }

    /// Replace every field of a contributor.
    pub async fn update(&self, id: &str, input: ContributorInput) -> Result<Contributor, Error> {
        let id = ContributorId::parse(id)?;
        let input = input.validated()?;
        let contributor = self.store.update(&id, &input).await?;

        tracing::debug!(id = %contributor.id, "contributor updated");
        self.invalidate(&contributor);
        self.notifier.publish(ContributorEvent::Updated { contributor: contributor.clone() });

        Ok(contributor)
    }

    pub async fn delete(&self, id: &str) -> Result<(), Error> {
        let id = ContributorId::parse(id)?;
        let removed = self.store.delete(&id).await?;

        tracing::debug!(id = %removed.id, "contributor deleted");
        self.invalidate(&removed);
        self.notifier.publish(ContributorEvent::Deleted { contributor: removed });

        Ok(())
    }

    /// Page through contributors, newest first. Never cached.
    pub async fn list(&self, limit: Option<u32>, offset: Option<u32>) -> Result<Vec<Contributor>, Error> {
        let limit = limit.unwrap_or(self.config.default_list_limit).min(self.config.max_list_limit);
        self.store.list(limit, offset.unwrap_or(0)).await
    }

    /// Receive change events published after this call.
    pub fn subscribe(&self) -> Subscription {
        self.notifier.subscribe()
    }

    /// Purge expired cache entries and prune the key index.
    ///
    /// Returns the number of cache entries removed.
    pub async fn sweep(&self) -> Result<u64, Error> {
        // Index entries must outlive every key they cover and any populate
        // still holding a sequence snapshot.
        let forgotten = self.index.forget_stale(self.config.cache_ttl + self.config.cache_timeout);
        let purged = self.cache.purge_expired().await?;
        tracing::debug!(purged, forgotten, "cache sweep finished");
        Ok(purged)
    }

    /// Wait up to `grace` for background cache jobs to finish.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        let drained = self.tasks.drain(grace).await;
        if drained {
            tracing::info!("background cache jobs drained");
        } else {
            tracing::warn!(in_flight = self.tasks.in_flight(), "shutdown grace elapsed, cache jobs abandoned");
        }
        drained
    }

    pub fn background(&self) -> &BackgroundTasks {
        &self.tasks
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    async fn read_cached(&self, key: &str, matches: impl Fn(&Contributor) -> bool) -> Cached {
        let payload = match tokio::time::timeout(self.config.cache_timeout, self.cache.get(key)).await {
            Ok(Ok(Some(payload))) => payload,
            Ok(Ok(None)) => {
                tracing::debug!(key, "cache miss");
                return Cached::Miss;
            }
            Ok(Err(e)) => {
                tracing::warn!(key, error = %e, "cache read failed, falling back to store");
                return Cached::Miss;
            }
            Err(_) => {
                tracing::warn!(key, "cache read timed out, falling back to store");
                return Cached::Miss;
            }
        };

        match serde_json::from_str::<Contributor>(&payload) {
            Ok(contributor) if matches(&contributor) => {
                tracing::debug!(key, "cache hit");
                Cached::Hit(contributor)
            }
            Ok(contributor) => {
                tracing::warn!(key, cached_id = %contributor.id, "cache entry holds another record, ignored");
                Cached::Unusable
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "cache entry undecodable, ignored");
                Cached::Unusable
            }
        }
    }

    fn after_store_read(
        &self, key: String, cached: Cached, result: Result<Contributor, Error>, seen: u64,
    ) -> Result<Contributor, Error> {
        match result {
            Ok(contributor) => {
                self.schedule_populate(key, &contributor, seen);
                Ok(contributor)
            }
            Err(e) => {
                if matches!(cached, Cached::Unusable) && matches!(e, Error::NotFound(_)) {
                    self.schedule_evict(key);
                }
                Err(e)
            }
        }
    }

    /// Delete every key that may hold `contributor`.
    ///
    /// Never dropped for capacity: the job queues for a permit. Keys whose
    /// delete fails stay in the index and are retried by the next write.
    fn invalidate(&self, contributor: &Contributor) {
        let Invalidation { sequence, keys: mut stale } = self.index.record_write(&contributor.id);
        for key in [keys::by_id(contributor.id.as_str()), keys::by_username(&contributor.username)] {
            if !stale.contains(&key) {
                stale.push(key);
            }
        }

        let cache = Arc::clone(&self.cache);
        let index = Arc::clone(&self.index);
        let id = contributor.id.clone();

        self.tasks.spawn_required("invalidate", async move {
            let mut deleted = Vec::with_capacity(stale.len());
            let mut first_err = None;
            for key in stale {
                match cache.delete(&key).await {
                    Ok(()) => deleted.push(key),
                    Err(e) => {
                        first_err.get_or_insert(e);
                    }
                }
            }
            index.confirm_deleted(&id, &deleted, sequence);
            first_err.map_or(Ok(()), Err)
        });
    }

    fn schedule_populate(&self, key: String, contributor: &Contributor, seen: u64) {
        let payload = match serde_json::to_string(contributor) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache payload encode failed, populate skipped");
                return;
            }
        };

        let cache = Arc::clone(&self.cache);
        let index = Arc::clone(&self.index);
        let id = contributor.id.clone();
        let ttl = self.config.cache_ttl;

        self.tasks.spawn("populate", async move {
            if !index.register(&id, &key, seen) {
                tracing::debug!(id = %id, key = %key, "contributor written since read, populate skipped");
                return Ok(());
            }
            cache.set(&key, &payload, ttl).await
        });
    }

    /// Best-effort eviction of an unusable entry for a record that no
    /// longer exists.
    fn schedule_evict(&self, key: String) {
        let cache = Arc::clone(&self.cache);
        self.tasks.spawn("evict", async move { cache.delete(&key).await });
    }
}
