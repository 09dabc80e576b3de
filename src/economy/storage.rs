use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, info};
use sled::IVec;

use crate::economy::errors::EconomyError;
use crate::economy::types::{UserRecord, USER_SCHEMA_VERSION};

const TREE_USERS: &str = "economy_users";
const USERS_PREFIX: &str = "users:";

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct EconomyStoreBuilder {
    path: PathBuf,
}

impl EconomyStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open(self) -> Result<EconomyStore, EconomyError> {
        EconomyStore::open(self.path)
    }
}

/// Sled-backed keyed repository of user records.
///
/// Reads create the default record on first access, so callers never see a
/// "no such user" error. Every write is flushed before returning.
pub struct EconomyStore {
    db: sled::Db,
    users: sled::Tree,
}

impl EconomyStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EconomyError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let users = db.open_tree(TREE_USERS)?;
        Ok(Self { db, users })
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), EconomyError> {
        self.db.flush()?;
        Ok(())
    }

    fn user_key(id: &str) -> Vec<u8> {
        format!("{}{}", USERS_PREFIX, id).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, EconomyError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, EconomyError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    fn decode_user(bytes: IVec) -> Result<UserRecord, EconomyError> {
        let record: UserRecord = Self::deserialize(bytes)?;
        if record.schema_version != USER_SCHEMA_VERSION {
            return Err(EconomyError::SchemaMismatch {
                entity: "user",
                expected: USER_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// Fetch a user record if it has been created.
    pub fn find_user(&self, id: &str) -> Result<Option<UserRecord>, EconomyError> {
        match self.users.get(Self::user_key(id))? {
            Some(bytes) => Ok(Some(Self::decode_user(bytes)?)),
            None => Ok(None),
        }
    }

    /// Fetch a user record, creating and persisting the default record on first access.
    pub fn get_user(&self, id: &str) -> Result<UserRecord, EconomyError> {
        if let Some(record) = self.find_user(id)? {
            return Ok(record);
        }
        let record = UserRecord::new(id, Utc::now());
        let bytes = Self::serialize(&record)?;
        // compare_and_swap keeps creation at-most-once even if two readers race.
        match self
            .users
            .compare_and_swap(Self::user_key(id), None as Option<&[u8]>, Some(bytes))?
        {
            Ok(()) => {
                self.users.flush()?;
                debug!("created default record for user {}", id);
                Ok(record)
            }
            Err(existing) => match existing.current {
                Some(bytes) => Self::decode_user(bytes),
                None => Err(EconomyError::Internal(format!(
                    "user {} vanished during creation",
                    id
                ))),
            },
        }
    }

    /// Insert or update a user record.
    pub fn put_user(&self, mut record: UserRecord) -> Result<(), EconomyError> {
        record.schema_version = USER_SCHEMA_VERSION;
        let key = Self::user_key(&record.id);
        let bytes = Self::serialize(&record)?;
        self.users.insert(key, bytes)?;
        self.users.flush()?;
        Ok(())
    }

    /// Read-modify-write helper. The closure's error aborts the write.
    pub fn update_user<T, F>(&self, id: &str, mutate: F) -> Result<T, EconomyError>
    where
        F: FnOnce(&mut UserRecord) -> Result<T, EconomyError>,
    {
        let mut record = self.get_user(id)?;
        let out = mutate(&mut record)?;
        self.put_user(record)?;
        Ok(out)
    }

    /// Replace a user's record with fresh defaults (`joined_at = now`).
    pub fn reset_user(&self, id: &str) -> Result<UserRecord, EconomyError> {
        let record = UserRecord::new(id, Utc::now());
        self.put_user(record.clone())?;
        info!("reset user {} to defaults", id);
        Ok(record)
    }

    /// List all user ids currently stored.
    pub fn list_user_ids(&self) -> Result<Vec<String>, EconomyError> {
        let mut ids = Vec::new();
        for entry in self.users.scan_prefix(USERS_PREFIX.as_bytes()) {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(id) = text.strip_prefix(USERS_PREFIX) {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    /// Visit every stored record, persisting those the closure reports as changed.
    /// Returns the number of records rewritten.
    pub fn sweep_users<F>(&self, mut visit: F) -> Result<usize, EconomyError>
    where
        F: FnMut(&mut UserRecord) -> bool,
    {
        let mut touched = 0usize;
        for entry in self.users.scan_prefix(USERS_PREFIX.as_bytes()) {
            let (key, bytes) = entry?;
            let mut record = Self::decode_user(bytes)?;
            if visit(&mut record) {
                self.users.insert(key, Self::serialize(&record)?)?;
                touched += 1;
            }
        }
        if touched > 0 {
            self.users.flush()?;
        }
        Ok(touched)
    }

    pub fn user_count(&self) -> usize {
        self.users.scan_prefix(USERS_PREFIX.as_bytes()).count()
    }

    /// Write the whole table as one JSON document (user id -> record).
    pub fn export_json<P: AsRef<Path>>(&self, path: P) -> Result<usize, EconomyError> {
        let mut table = BTreeMap::new();
        for entry in self.users.scan_prefix(USERS_PREFIX.as_bytes()) {
            let (_, bytes) = entry?;
            let record = Self::decode_user(bytes)?;
            table.insert(record.id.clone(), record);
        }
        let json = serde_json::to_string_pretty(&table)?;
        std::fs::write(path, json)?;
        Ok(table.len())
    }

    /// Load a JSON document (user id -> record) and upsert every entry.
    pub fn import_json<P: AsRef<Path>>(&self, path: P) -> Result<usize, EconomyError> {
        let text = std::fs::read_to_string(path)?;
        let table: BTreeMap<String, UserRecord> = serde_json::from_str(&text)?;
        let count = table.len();
        for (id, mut record) in table {
            record.id = id;
            record.level = record
                .level
                .max(UserRecord::level_for_experience(record.experience));
            self.put_user(record)?;
        }
        Ok(count)
    }
}
