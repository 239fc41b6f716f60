//! In-process store

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::UserStore;
use crate::error::StoreError;
use crate::session::{UserId, UserProgress};

/// Store backed by a map; used by simulations and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<UserId, UserProgress>>,
    /// Refuse writes, to exercise flush failures
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with records
    pub fn with_users(users: impl IntoIterator<Item = UserProgress>) -> Self {
        let store = Self::new();
        {
            let mut map = store.users.lock();
            for user in users {
                map.insert(user.user_id, user);
            }
        }
        store
    }

    /// Simulate an outage: every write fails until switched back
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.users.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.lock().is_empty()
    }

    /// Stored copy of a record, without creating one
    pub fn peek(&self, user_id: UserId) -> Option<UserProgress> {
        self.users.lock().get(&user_id).cloned()
    }
}

impl UserStore for MemoryStore {
    fn fetch(&self, user_id: UserId) -> Result<UserProgress, StoreError> {
        let mut users = self.users.lock();
        Ok(users
            .entry(user_id)
            .or_insert_with(|| UserProgress::new(user_id))
            .clone())
    }

    fn save(&self, user: &UserProgress) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }
        self.users.lock().insert(user.user_id, user.clone());
        Ok(())
    }

    fn all(&self) -> Result<Vec<UserProgress>, StoreError> {
        let mut users: Vec<UserProgress> = self.users.lock().values().cloned().collect();
        users.sort_by_key(|u| u.user_id);
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_creates_zeroed_record() {
        let store = MemoryStore::new();
        let user = store.fetch(9).unwrap();
        assert_eq!(user, UserProgress::new(9));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_save_and_outage() {
        let store = MemoryStore::new();
        let mut user = UserProgress::new(3);
        user.xp = 77;
        store.save(&user).unwrap();
        assert_eq!(store.peek(3).unwrap().xp, 77);

        store.set_unavailable(true);
        user.xp = 80;
        assert!(store.save(&user).is_err());
        assert_eq!(store.peek(3).unwrap().xp, 77);
    }
}
