//! Process-local index from contributor id to the cache keys holding it.
//!
//! A contributor can be cached under several keys (by id, by username).
//! Writes invalidate every key recorded here. The index also tracks a write
//! sequence so a populate that read the store before a write can tell it is
//! carrying a stale snapshot.
//!
//! A key leaves the index only once its deletion is confirmed, so an
//! invalidation that failed or timed out is retried by the next write.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::model::ContributorId;

#[derive(Debug)]
struct Entry {
    /// Cache key to the sequence its populate read the store at.
    keys: HashMap<String, u64>,
    last_write: u64,
    touched: Instant,
}

impl Entry {
    fn new() -> Self {
        Self { keys: HashMap::new(), last_write: 0, touched: Instant::now() }
    }
}

#[derive(Debug, Default)]
struct State {
    sequence: u64,
    entries: HashMap<ContributorId, Entry>,
}

/// Keys to delete after a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    /// Sequence assigned to the write.
    pub sequence: u64,
    pub keys: Vec<String>,
}

#[derive(Debug, Default)]
pub struct KeyIndex {
    state: Mutex<State>,
}

impl KeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // The index is advisory; a poisoned lock still holds usable data.
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current write sequence. Capture it before reading the store.
    pub fn sequence(&self) -> u64 {
        self.state().sequence
    }

    /// Record that `key` is about to cache `id`.
    ///
    /// Returns `false`, recording nothing, if `id` was written after
    /// sequence `seen`; the caller then holds a stale snapshot.
    pub fn register(&self, id: &ContributorId, key: &str, seen: u64) -> bool {
        let mut state = self.state();
        let entry = state.entries.entry(id.clone()).or_insert_with(Entry::new);
        if entry.last_write > seen {
            return false;
        }
        let recorded = entry.keys.entry(key.to_string()).or_insert(seen);
        *recorded = (*recorded).max(seen);
        entry.touched = Instant::now();
        true
    }

    /// Record a write to `id` and hand back every key that may hold it.
    ///
    /// The keys stay recorded until [`KeyIndex::confirm_deleted`].
    pub fn record_write(&self, id: &ContributorId) -> Invalidation {
        let mut state = self.state();
        state.sequence += 1;
        let sequence = state.sequence;

        let entry = state.entries.entry(id.clone()).or_insert_with(Entry::new);
        entry.last_write = sequence;
        entry.touched = Instant::now();
        Invalidation { sequence, keys: entry.keys.keys().cloned().collect() }
    }

    /// Forget `keys` for `id` after they were deleted for write `sequence`.
    ///
    /// Keys populated after that write hold fresh data and stay recorded.
    pub fn confirm_deleted(&self, id: &ContributorId, keys: &[String], sequence: u64) {
        let mut state = self.state();
        if let Some(entry) = state.entries.get_mut(id) {
            for key in keys {
                if entry.keys.get(key).is_some_and(|seen| *seen < sequence) {
                    entry.keys.remove(key);
                }
            }
        }
    }

    /// Drop entries untouched for longer than `max_age`, returning how many.
    ///
    /// Safe once `max_age` covers both the cache TTL and the job timeout:
    /// by then every key recorded has expired and no populate that could
    /// consult the entry is still running.
    pub fn forget_stale(&self, max_age: Duration) -> usize {
        let mut state = self.state();
        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.touched.elapsed() < max_age);
        before - state.entries.len()
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_returns_all_registered_keys() {
        let index = KeyIndex::new();
        let id = ContributorId::generate();
        let seen = index.sequence();

        assert!(index.register(&id, "contributor:x", seen));
        assert!(index.register(&id, "contributor:username:alice", seen));

        let mut invalidation = index.record_write(&id);
        invalidation.keys.sort();
        assert_eq!(invalidation.keys, vec!["contributor:username:alice", "contributor:x"]);

        index.confirm_deleted(&id, &invalidation.keys, invalidation.sequence);
        assert!(index.record_write(&id).keys.is_empty());
    }

    #[test]
    fn test_unconfirmed_keys_are_returned_again() {
        let index = KeyIndex::new();
        let id = ContributorId::generate();
        index.register(&id, "contributor:x", index.sequence());

        let first = index.record_write(&id);
        index.confirm_deleted(&id, &[], first.sequence);

        let second = index.record_write(&id);
        assert_eq!(second.keys, vec!["contributor:x"]);
        assert!(second.sequence > first.sequence);
    }

    #[test]
    fn test_confirm_keeps_keys_populated_after_write() {
        let index = KeyIndex::new();
        let id = ContributorId::generate();
        index.register(&id, "contributor:x", index.sequence());

        let invalidation = index.record_write(&id);
        assert!(index.register(&id, "contributor:x", index.sequence()));
        index.confirm_deleted(&id, &invalidation.keys, invalidation.sequence);

        assert_eq!(index.record_write(&id).keys, vec!["contributor:x"]);
    }

    #[test]
    fn test_register_rejected_after_newer_write() {
        let index = KeyIndex::new();
        let id = ContributorId::generate();
        let seen = index.sequence();

        index.record_write(&id);

        assert!(!index.register(&id, "contributor:x", seen));
        assert!(index.register(&id, "contributor:x", index.sequence()));
    }

    #[test]
    fn test_writes_to_other_ids_do_not_block() {
        let index = KeyIndex::new();
        let a = ContributorId::generate();
        let b = ContributorId::generate();
        let seen = index.sequence();

        index.record_write(&b);

        assert!(index.register(&a, "contributor:a", seen));
    }

    #[test]
    fn test_forget_stale() {
        let index = KeyIndex::new();
        let id = ContributorId::generate();
        index.register(&id, "k", 0);

        assert_eq!(index.forget_stale(Duration::from_secs(3600)), 0);
        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(index.forget_stale(Duration::from_millis(5)), 1);
        assert!(index.is_empty());
    }
}
