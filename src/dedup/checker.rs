use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use super::key::{Identified, IdentityKey, KEY_SEPARATOR};
use crate::store::{ExistingRecordRef, PlaceStore, StoreError};

/// Identity pairs per underlying store query
pub const DEFAULT_CHUNK_SIZE: usize = 100;
/// Chunk queries allowed in flight at once
pub const DEFAULT_MAX_CONCURRENT_LOOKUPS: usize = 4;

/// Outcome of checking one identity key against the store.
///
/// Serializes flat: `{"isNew": true}` or
/// `{"isNew": false, "existingId": ..., "collectedAt": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "DuplicateCheckWire")]
pub enum DuplicateCheckResult {
    New,
    Existing {
        existing_id: String,
        collected_at: DateTime<Utc>,
    },
}

impl DuplicateCheckResult {
    pub fn is_new(&self) -> bool {
        matches!(self, DuplicateCheckResult::New)
    }

    pub fn existing_id(&self) -> Option<&str> {
        match self {
            DuplicateCheckResult::New => None,
            DuplicateCheckResult::Existing { existing_id, .. } => Some(existing_id),
        }
    }

    pub fn collected_at(&self) -> Option<DateTime<Utc>> {
        match self {
            DuplicateCheckResult::New => None,
            DuplicateCheckResult::Existing { collected_at, .. } => Some(*collected_at),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DuplicateCheckWire {
    is_new: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    existing_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    collected_at: Option<DateTime<Utc>>,
}

impl From<DuplicateCheckResult> for DuplicateCheckWire {
    fn from(result: DuplicateCheckResult) -> Self {
        match result {
            DuplicateCheckResult::New => Self {
                is_new: true,
                existing_id: None,
                collected_at: None,
            },
            DuplicateCheckResult::Existing {
                existing_id,
                collected_at,
            } => Self {
                is_new: false,
                existing_id: Some(existing_id),
                collected_at: Some(collected_at),
            },
        }
    }
}

impl From<Option<&ExistingRecordRef>> for DuplicateCheckResult {
    fn from(existing: Option<&ExistingRecordRef>) -> Self {
        match existing {
            Some(record) => DuplicateCheckResult::Existing {
                existing_id: record.id.clone(),
                collected_at: record.collected_at,
            },
            None => DuplicateCheckResult::New,
        }
    }
}

/// Records split into not-yet-stored and already-stored, each in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterResult<R> {
    pub new_places: Vec<R>,
    pub existing_places: Vec<R>,
}

impl<R> Default for FilterResult<R> {
    fn default() -> Self {
        Self {
            new_places: Vec::new(),
            existing_places: Vec::new(),
        }
    }
}

impl<R> FilterResult<R> {
    pub fn len(&self) -> usize {
        self.new_places.len() + self.existing_places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partitions candidate records into new and known ones by identity key.
///
/// Only reads from the store. Store errors are returned as-is; retrying is
/// the caller's decision.
pub struct Deduplicator<S> {
    store: Arc<S>,
    chunk_size: usize,
    max_concurrent_lookups: usize,
}

impl<S> Clone for Deduplicator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            chunk_size: self.chunk_size,
            max_concurrent_lookups: self.max_concurrent_lookups,
        }
    }
}

impl<S: PlaceStore> Deduplicator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrent_lookups: DEFAULT_MAX_CONCURRENT_LOOKUPS,
        }
    }

    /// Set the number of keys per store query (minimum 1)
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set how many chunk queries may run concurrently (minimum 1)
    pub fn with_max_concurrent_lookups(mut self, max: usize) -> Self {
        self.max_concurrent_lookups = max.max(1);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Check a single identity pair.
    pub async fn check_duplicate(
        &self,
        public_data_id: &str,
        source_api: &str,
    ) -> Result<DuplicateCheckResult, StoreError> {
        let key = IdentityKey::new(public_data_id, source_api);
        let existing = self.store.find_by_identity(&key).await?;
        Ok(DuplicateCheckResult::from(existing.as_ref()))
    }

    /// Check many identity pairs, keyed by [`IdentityKey::map_key`].
    ///
    /// Same answers as calling [`check_duplicate`](Self::check_duplicate) per
    /// pair. Lookups are grouped into chunks of `chunk_size` and repeated
    /// pairs are only queried once.
    ///
    /// Identifiers containing [`KEY_SEPARATOR`] can join to the same string
    /// key as a different pair; such collisions are logged and the first pair
    /// in input order keeps the entry. Use
    /// [`filter_new_places`](Self::filter_new_places) when that matters.
    pub async fn check_duplicates_batch(
        &self,
        identifiers: &[IdentityKey],
    ) -> Result<HashMap<String, DuplicateCheckResult>, StoreError> {
        let (unique, mut results) = self.lookup_batch(identifiers).await?;

        let mut by_string = HashMap::with_capacity(unique.len());
        for key in unique {
            let Some(result) = results.remove(&key) else {
                continue;
            };
            match by_string.entry(key.map_key()) {
                Entry::Vacant(slot) => {
                    slot.insert(result);
                }
                Entry::Occupied(slot) => {
                    warn!(
                        public_data_id = %key.public_data_id,
                        source_api = %key.source_api,
                        map_key = %slot.key(),
                        "identity pair collides with another under its string key"
                    );
                }
            }
        }
        Ok(by_string)
    }

    /// Batch lookup keyed by the identity pair itself.
    ///
    /// Returns the distinct keys in first-seen order alongside the results.
    async fn lookup_batch(
        &self,
        identifiers: &[IdentityKey],
    ) -> Result<(Vec<IdentityKey>, HashMap<IdentityKey, DuplicateCheckResult>), StoreError> {
        let mut seen = HashSet::new();
        let unique: Vec<IdentityKey> = identifiers
            .iter()
            .filter(|key| seen.insert(*key))
            .cloned()
            .collect();

        for key in &unique {
            if key.public_data_id.contains(KEY_SEPARATOR) || key.source_api.contains(KEY_SEPARATOR) {
                warn!(%key, "identifier contains the key separator");
            }
        }

        let chunks = unique.chunks(self.chunk_size);
        let chunk_count = chunks.len();
        let found: Vec<Vec<ExistingRecordRef>> = stream::iter(chunks)
            .map(|chunk| self.store.find_by_identities(chunk))
            .buffer_unordered(self.max_concurrent_lookups)
            .try_collect()
            .await?;

        let existing: HashMap<IdentityKey, ExistingRecordRef> = found
            .into_iter()
            .flatten()
            .map(|record| (record.identity(), record))
            .collect();

        debug!(
            requested = identifiers.len(),
            unique = unique.len(),
            chunks = chunk_count,
            existing = existing.len(),
            "batch duplicate check"
        );

        let results = unique
            .iter()
            .map(|key| (key.clone(), DuplicateCheckResult::from(existing.get(key))))
            .collect();
        Ok((unique, results))
    }

    /// Stable partition of `records` into new and already-stored.
    pub async fn filter_new_places<R: Identified>(
        &self,
        records: Vec<R>,
    ) -> Result<FilterResult<R>, StoreError> {
        let keys: Vec<IdentityKey> = records.iter().map(Identified::identity).collect();
        let (_, results) = self.lookup_batch(&keys).await?;

        let mut partition = FilterResult::default();
        for (record, key) in records.into_iter().zip(keys) {
            let is_new = results
                .get(&key)
                .map_or(true, DuplicateCheckResult::is_new);
            if is_new {
                partition.new_places.push(record);
            } else {
                partition.existing_places.push(record);
            }
        }

        Ok(partition)
    }

    /// Incremental filter for one source.
    ///
    /// Records whose key was collected for `source_api` after `since` are
    /// known without a further lookup. Everything else still goes through
    /// [`filter_new_places`](Self::filter_new_places) against the whole store,
    /// since a record collected before `since` still exists.
    ///
    /// `existing_places` lists the recent matches first, then the records
    /// confirmed by the full check.
    pub async fn get_new_places_since<R: Identified>(
        &self,
        source_api: &str,
        since: DateTime<Utc>,
        records: Vec<R>,
    ) -> Result<FilterResult<R>, StoreError> {
        let recent = self.store.keys_collected_since(source_api, since).await?;

        let (recent_matches, unchecked): (Vec<R>, Vec<R>) = records
            .into_iter()
            .partition(|record| recent.contains(&record.identity()));

        debug!(
            source_api,
            %since,
            recent = recent_matches.len(),
            unchecked = unchecked.len(),
            "incremental pre-filter"
        );

        let checked = self.filter_new_places(unchecked).await?;

        let mut existing_places = recent_matches;
        existing_places.extend(checked.existing_places);

        Ok(FilterResult {
            new_places: checked.new_places,
            existing_places,
        })
    }
}
