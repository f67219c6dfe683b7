use async_trait::async_trait;
use atomic_write_file::AtomicWriteFile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use super::{ExistingRecordRef, NewPlace, PlaceStore, StoreError, StoredPlace};
use crate::dedup::IdentityKey;

const STORE_FILE_VERSION: u32 = 1;

/// Get the default store file path (~/.config/odog/places.json)
pub fn get_store_path() -> PathBuf {
    crate::config::get_config_dir().join("places.json")
}

/// On-disk layout of the store file
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreFile {
    version: u32,
    next_id: u64,
    #[serde(default)]
    places: Vec<StoredPlace>,
}

#[derive(Debug, Default)]
struct StoreData {
    next_id: u64,
    places: HashMap<IdentityKey, StoredPlace>,
}

/// Place store held in memory and persisted as a single JSON file.
///
/// The identity key is the map key, so uniqueness of
/// `(public_data_id, source_api)` is enforced under the write lock.
/// Every read query bumps a counter, which lets callers observe how many
/// round-trips a batch check issued.
#[derive(Debug, Default)]
pub struct JsonStore {
    inner: RwLock<StoreData>,
    lookups: AtomicUsize,
}

impl JsonStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a JSON file.
    ///
    /// If the file doesn't exist, returns a new empty store.
    /// If the file exists but has an unsupported version, returns an error.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "store file missing, starting empty");
            return Ok(Self::new());
        }

        let file = File::open(path)?;
        let stored: StoreFile = serde_json::from_reader(file)?;

        if stored.version != STORE_FILE_VERSION {
            return Err(StoreError::UnsupportedVersion(stored.version));
        }

        let places: HashMap<_, _> = stored
            .places
            .into_iter()
            .map(|place| (place.key(), place))
            .collect();
        info!(path = %path.display(), count = places.len(), "loaded place store");

        Ok(Self {
            inner: RwLock::new(StoreData {
                next_id: stored.next_id,
                places,
            }),
            lookups: AtomicUsize::new(0),
        })
    }

    /// Save the store to a JSON file atomically.
    ///
    /// The file is never left half-written; the parent directory is created
    /// if needed.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let stored = {
            let data = self.read()?;
            let mut places: Vec<StoredPlace> = data.places.values().cloned().collect();
            places.sort_by(|a, b| {
                (&a.source_api, &a.public_data_id).cmp(&(&b.source_api, &b.public_data_id))
            });
            StoreFile {
                version: STORE_FILE_VERSION,
                next_id: data.next_id,
                places,
            }
        };

        let mut file = AtomicWriteFile::open(path)?;
        serde_json::to_writer_pretty(&mut file, &stored)?;
        file.commit()?;

        info!(path = %path.display(), count = stored.places.len(), "saved place store");
        Ok(())
    }

    /// Number of stored rows
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.places.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Number of read queries served so far
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Full row for a key, if stored
    pub fn get(&self, key: &IdentityKey) -> Result<Option<StoredPlace>, StoreError> {
        Ok(self.read()?.places.get(key).cloned())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreData>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Connection("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreData>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Connection("store lock poisoned".to_string()))
    }

    fn insert_row(&self, place: NewPlace) -> Result<ExistingRecordRef, StoreError> {
        let mut data = self.write()?;
        if data.places.contains_key(&place.key) {
            return Err(StoreError::UniqueViolation(place.key));
        }

        data.next_id += 1;
        let row = StoredPlace {
            id: format!("place-{}", data.next_id),
            public_data_id: place.key.public_data_id.clone(),
            source_api: place.key.source_api.clone(),
            created_at: place.collected_at,
            collected_at: place.collected_at,
            payload: place.payload,
        };
        let record = row.to_ref();
        data.places.insert(place.key, row);
        Ok(record)
    }
}

#[async_trait]
impl PlaceStore for JsonStore {
    async fn find_by_identity(
        &self,
        key: &IdentityKey,
    ) -> Result<Option<ExistingRecordRef>, StoreError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        Ok(self.read()?.places.get(key).map(StoredPlace::to_ref))
    }

    async fn find_by_identities(
        &self,
        keys: &[IdentityKey],
    ) -> Result<Vec<ExistingRecordRef>, StoreError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let data = self.read()?;
        let found: Vec<_> = keys
            .iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .filter_map(|key| data.places.get(key).map(StoredPlace::to_ref))
            .collect();
        debug!(requested = keys.len(), found = found.len(), "batch identity lookup");
        Ok(found)
    }

    async fn keys_collected_since(
        &self,
        source_api: &str,
        since: DateTime<Utc>,
    ) -> Result<HashSet<IdentityKey>, StoreError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .read()?
            .places
            .values()
            .filter(|place| place.source_api == source_api && place.collected_at > since)
            .map(StoredPlace::key)
            .collect())
    }

    async fn insert(&self, place: NewPlace) -> Result<ExistingRecordRef, StoreError> {
        self.insert_row(place)
    }

    async fn touch_collected_at(
        &self,
        key: &IdentityKey,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut data = self.write()?;
        match data.places.get_mut(key) {
            Some(place) => {
                place.collected_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
