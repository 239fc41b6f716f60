//! JSON file store
//!
//! Keeps every user record in a single JSON document. The whole file is
//! rewritten on each batch, through a temporary file and a rename so a crash
//! mid-write leaves the previous version intact.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::UserStore;
use crate::error::StoreError;
use crate::session::{UserId, UserProgress};

/// File format version for compatibility checking
const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    users: Vec<UserProgress>,
}

/// Get the default store path in the platform data directory
pub fn default_store_path() -> PathBuf {
    use directories::ProjectDirs;

    if let Some(proj_dirs) = ProjectDirs::from("com", "ladyflamme", "LadyFlamme") {
        let mut path = proj_dirs.data_local_dir().to_path_buf();
        path.push("users.json");
        path
    } else {
        PathBuf::from("./users.json")
    }
}

/// File-backed user store
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    users: Mutex<BTreeMap<UserId, UserProgress>>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let users = if path.exists() {
            Self::read(&path)?
        } else {
            log::info!("No user store at {:?}, starting empty", path);
            BTreeMap::new()
        };
        log::info!("User store opened at {:?} ({} users)", path, users.len());
        Ok(Self {
            path,
            users: Mutex::new(users),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> Result<BTreeMap<UserId, UserProgress>, StoreError> {
        let data = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: StoreFile = serde_json::from_str(&data).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if file.version != STORE_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: STORE_VERSION,
                found: file.version,
            });
        }

        Ok(file.users.into_iter().map(|u| (u.user_id, u)).collect())
    }

    fn write(&self, users: &BTreeMap<UserId, UserProgress>) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let file = StoreFile {
            version: STORE_VERSION,
            users: users.values().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(StoreError::Serialize)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;

        log::debug!("Wrote {} users to {:?}", users.len(), self.path);
        Ok(())
    }
}

impl UserStore for JsonFileStore {
    fn fetch(&self, user_id: UserId) -> Result<UserProgress, StoreError> {
        // New users only reach the file with their first save
        Ok(self
            .users
            .lock()
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| UserProgress::new(user_id)))
    }

    fn save(&self, user: &UserProgress) -> Result<(), StoreError> {
        self.save_many(std::slice::from_ref(user))
    }

    fn save_many(&self, batch: &[UserProgress]) -> Result<(), StoreError> {
        let mut users = self.users.lock();
        let mut next = users.clone();
        for user in batch {
            next.insert(user.user_id, user.clone());
        }
        self.write(&next)?;
        *users = next;
        Ok(())
    }

    fn all(&self) -> Result<Vec<UserProgress>, StoreError> {
        Ok(self.users.lock().values().cloned().collect())
    }
}
