//! User record storage
//!
//! A `UserStore` is the durable side; `WriteBackCache` keeps the authoritative
//! in-memory copies and writes dirty records back in batches.

pub mod memory;
pub mod json_file;
pub mod cache;
pub mod flush;

pub use memory::MemoryStore;
pub use json_file::{JsonFileStore, default_store_path};
pub use cache::{WriteBackCache, FlushReport};
pub use flush::FlushLoop;

use crate::error::StoreError;
use crate::session::{UserId, UserProgress};

/// Durable storage of user records, keyed by user id
pub trait UserStore: Send + Sync {
    /// Fetch a record, or a zeroed one if the user is unknown
    fn fetch(&self, user_id: UserId) -> Result<UserProgress, StoreError>;

    /// Insert or replace a record
    fn save(&self, user: &UserProgress) -> Result<(), StoreError>;

    /// Insert or replace several records
    fn save_many(&self, users: &[UserProgress]) -> Result<(), StoreError> {
        for user in users {
            self.save(user)?;
        }
        Ok(())
    }

    /// Every stored record
    fn all(&self) -> Result<Vec<UserProgress>, StoreError>;
}
