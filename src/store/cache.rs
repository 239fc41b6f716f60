//! Write-back cache of user records
//!
//! The cache owns the authoritative copy of every user it has seen. Mutations
//! happen in memory under a per-user lock and mark the user dirty; `flush`
//! writes the dirty records to the store in one batch. A failed flush keeps
//! the users dirty so the next flush retries them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;

use super::UserStore;
use crate::error::StoreError;
use crate::session::{UserId, UserProgress};

/// Result of one flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub written: usize,
    /// Users left dirty because the store refused the batch
    pub failed: usize,
}

/// In-memory user records in front of a `UserStore`.
///
/// Entries stay cached for the life of the process; only `evict_clean`
/// drops them.
pub struct WriteBackCache {
    store: Arc<dyn UserStore>,
    users: Mutex<HashMap<UserId, Arc<Mutex<UserProgress>>>>,
    dirty: Mutex<HashSet<UserId>>,
}

impl std::fmt::Debug for WriteBackCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteBackCache")
            .field("cached", &self.users.lock().len())
            .field("dirty", &self.dirty.lock().len())
            .finish()
    }
}

impl WriteBackCache {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self {
            store,
            users: Mutex::new(HashMap::new()),
            dirty: Mutex::new(HashSet::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    /// Cached record handle, loading it from the store on first use
    fn entry(&self, user_id: UserId) -> Result<Arc<Mutex<UserProgress>>, StoreError> {
        if let Some(existing) = self.users.lock().get(&user_id) {
            return Ok(Arc::clone(existing));
        }

        // Load outside the map lock; if another thread won the race, keep its copy.
        let loaded = self.store.fetch(user_id)?;
        let mut users = self.users.lock();
        let entry = users
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(loaded)));
        Ok(Arc::clone(entry))
    }

    /// Run `f` on a user's record under that user's lock.
    ///
    /// The user is marked dirty if `f` changed the record.
    pub fn with_user<R>(
        &self,
        user_id: UserId,
        f: impl FnOnce(&mut UserProgress) -> R,
    ) -> Result<R, StoreError> {
        let entry = self.entry(user_id)?;
        let mut user = entry.lock();
        let before = user.clone();
        let result = f(&mut *user);
        if *user != before {
            self.mark_dirty(user_id);
        }
        Ok(result)
    }

    /// Snapshot of a user's record
    pub fn get(&self, user_id: UserId) -> Result<UserProgress, StoreError> {
        let entry = self.entry(user_id)?;
        let user = entry.lock().clone();
        Ok(user)
    }

    pub fn mark_dirty(&self, user_id: UserId) {
        self.dirty.lock().insert(user_id);
    }

    pub fn is_dirty(&self, user_id: UserId) -> bool {
        self.dirty.lock().contains(&user_id)
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.lock().len()
    }

    pub fn cached_count(&self) -> usize {
        self.users.lock().len()
    }

    /// Write every dirty user to the store
    pub fn flush(&self) -> FlushReport {
        // Drain under the map lock and hold the handles until the write is
        // settled, so `evict_clean` cannot drop a user mid-flush.
        let (pending, entries) = {
            let users = self.users.lock();
            let pending: Vec<UserId> = self.dirty.lock().drain().collect();
            let entries: Vec<Arc<Mutex<UserProgress>>> = pending
                .iter()
                .filter_map(|id| users.get(id).map(Arc::clone))
                .collect();
            (pending, entries)
        };
        if pending.is_empty() {
            return FlushReport::default();
        }

        let snapshots: Vec<UserProgress> = entries.iter().map(|entry| entry.lock().clone()).collect();

        match self.store.save_many(&snapshots) {
            Ok(()) => {
                log::info!("Flushed {} users to the store", snapshots.len());
                FlushReport {
                    written: snapshots.len(),
                    failed: 0,
                }
            }
            Err(e) => {
                log::warn!("Flush of {} users failed, will retry: {}", pending.len(), e);
                self.dirty.lock().extend(pending.iter().copied());
                FlushReport {
                    written: 0,
                    failed: pending.len(),
                }
            }
        }
    }

    /// Clear the daily counters of cached users last active before `today`.
    ///
    /// Backstop for users who go quiet; active users roll over inline on
    /// their next message.
    pub fn reset_stale_days(&self, today: NaiveDate) -> usize {
        let entries: Vec<(UserId, Arc<Mutex<UserProgress>>)> = self
            .users
            .lock()
            .iter()
            .map(|(id, entry)| (*id, Arc::clone(entry)))
            .collect();

        let mut reset = 0;
        for (id, entry) in entries {
            let mut user = entry.lock();
            let stale = matches!(user.last_active_day, Some(day) if day < today);
            if stale && (user.messages_today > 0 || user.xp_today > 0) {
                user.messages_today = 0;
                user.xp_today = 0;
                self.mark_dirty(id);
                reset += 1;
            }
        }
        if reset > 0 {
            log::info!("Reset daily counters for {} inactive users", reset);
        }
        reset
    }

    /// Drop cached users that are saved and not in use.
    ///
    /// Dirty users stay cached so a failed flush loses nothing. A user whose
    /// handle is held by another thread stays too, since the map lock is the
    /// only way to obtain a new handle.
    pub fn evict_clean(&self) -> usize {
        let mut users = self.users.lock();
        let dirty = self.dirty.lock().clone();
        let before = users.len();
        users.retain(|id, entry| dirty.contains(id) || Arc::strong_count(entry) > 1);
        let evicted = before - users.len();
        log::info!("Evicted {} clean users from the cache", evicted);
        evicted
    }

    /// All stored users, with cached copies taking precedence
    pub fn merged_users(&self) -> Result<Vec<UserProgress>, StoreError> {
        let mut merged: HashMap<UserId, UserProgress> = self
            .store
            .all()?
            .into_iter()
            .map(|u| (u.user_id, u))
            .collect();

        let entries: Vec<Arc<Mutex<UserProgress>>> =
            self.users.lock().values().map(Arc::clone).collect();
        for entry in entries {
            let user = entry.lock().clone();
            merged.insert(user.user_id, user);
        }

        let mut users: Vec<UserProgress> = merged.into_values().collect();
        users.sort_by_key(|u| u.user_id);
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn cache() -> (Arc<MemoryStore>, WriteBackCache) {
        let store = Arc::new(MemoryStore::new());
        let cache = WriteBackCache::new(store.clone());
        (store, cache)
    }

    #[test]
    fn test_changes_mark_dirty() {
        let (_, cache) = cache();
        cache.with_user(1, |u| u.xp += 10).unwrap();
        assert!(cache.is_dirty(1));

        cache.with_user(2, |u| u.xp).unwrap();
        assert!(!cache.is_dirty(2));
        assert_eq!(cache.cached_count(), 2);
    }

    #[test]
    fn test_flush_writes_and_clears() {
        let (store, cache) = cache();
        cache.with_user(1, |u| u.coins = 50).unwrap();

        let report = cache.flush();
        assert_eq!(report, FlushReport { written: 1, failed: 0 });
        assert_eq!(cache.dirty_count(), 0);
        assert_eq!(store.peek(1).unwrap().coins, 50);

        assert_eq!(cache.flush(), FlushReport::default());
    }

    #[test]
    fn test_failed_flush_keeps_dirty_state() {
        let (store, cache) = cache();
        cache.with_user(1, |u| u.xp = 500).unwrap();

        store.set_unavailable(true);
        let report = cache.flush();
        assert_eq!(report.failed, 1);
        assert!(cache.is_dirty(1));
        assert_eq!(cache.get(1).unwrap().xp, 500);

        store.set_unavailable(false);
        assert_eq!(cache.flush().written, 1);
        assert_eq!(store.peek(1).unwrap().xp, 500);
    }

    #[test]
    fn test_reset_stale_days() {
        let (_, cache) = cache();
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let tuesday = monday.succ_opt().unwrap();
        cache
            .with_user(1, |u| {
                u.last_active_day = Some(monday);
                u.messages_today = 3;
                u.xp_today = 300;
            })
            .unwrap();
        cache
            .with_user(2, |u| {
                u.last_active_day = Some(tuesday);
                u.messages_today = 1;
            })
            .unwrap();
        cache.flush();

        assert_eq!(cache.reset_stale_days(tuesday), 1);
        let one = cache.get(1).unwrap();
        assert_eq!((one.messages_today, one.xp_today), (0, 0));
        assert_eq!(cache.get(2).unwrap().messages_today, 1);
        assert!(cache.is_dirty(1));
        assert!(!cache.is_dirty(2));
    }

    #[test]
    fn test_evict_clean_keeps_dirty_users() {
        let (store, cache) = cache();
        cache.with_user(1, |u| u.xp = 10).unwrap();
        cache.with_user(2, |u| u.xp = 20).unwrap();
        cache.flush();
        cache.with_user(2, |u| u.xp = 25).unwrap();

        assert_eq!(cache.evict_clean(), 1);
        assert_eq!(cache.cached_count(), 1);
        assert!(cache.is_dirty(2));

        // Evicted users reload from the store unchanged
        assert_eq!(cache.get(1).unwrap().xp, 10);
        cache.flush();
        assert_eq!(store.peek(2).unwrap().xp, 25);
    }

    #[test]
    fn test_merged_users_prefer_cache() {
        let mut stored = UserProgress::new(1);
        stored.xp = 10;
        let store = Arc::new(MemoryStore::with_users([stored, UserProgress::new(2)]));
        let cache = WriteBackCache::new(store);
        cache.with_user(1, |u| u.xp = 99).unwrap();

        let users = cache.merged_users().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].xp, 99);
    }

    #[test]
    fn test_concurrent_updates_do_not_lose_increments() {
        let (_, cache) = cache();
        let cache = Arc::new(cache);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        cache.with_user(1, |u| u.xp += 1).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.get(1).unwrap().xp, 2_000);
    }
}
