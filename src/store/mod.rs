//! Backing store seam for ingestion.
//!
//! The deduplicator only reads through [`PlaceStore`]; writes are issued by the
//! ingestion coordinator. The store owns the uniqueness guarantee on
//! `(public_data_id, source_api)`.

mod error;
pub mod json;
pub mod types;

pub use error::StoreError;
pub use json::{get_store_path, JsonStore};
pub use types::{ExistingRecordRef, NewPlace, StoredPlace};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

use crate::dedup::IdentityKey;

#[async_trait]
pub trait PlaceStore: Send + Sync {
    /// Exact-match lookup by identity key.
    async fn find_by_identity(
        &self,
        key: &IdentityKey,
    ) -> Result<Option<ExistingRecordRef>, StoreError>;

    /// One query for many keys. Returns only the keys that exist, in any order.
    async fn find_by_identities(
        &self,
        keys: &[IdentityKey],
    ) -> Result<Vec<ExistingRecordRef>, StoreError>;

    /// Keys from `source_api` collected strictly after `since`.
    async fn keys_collected_since(
        &self,
        source_api: &str,
        since: DateTime<Utc>,
    ) -> Result<HashSet<IdentityKey>, StoreError>;

    /// Insert a new row. Fails with [`StoreError::UniqueViolation`] if the key exists.
    async fn insert(&self, place: NewPlace) -> Result<ExistingRecordRef, StoreError>;

    /// Refresh `collected_at`. Returns false if no row has this key.
    async fn touch_collected_at(
        &self,
        key: &IdentityKey,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
impl<S: PlaceStore + ?Sized> PlaceStore for Arc<S> {
    async fn find_by_identity(
        &self,
        key: &IdentityKey,
    ) -> Result<Option<ExistingRecordRef>, StoreError> {
        (**self).find_by_identity(key).await
    }

    async fn find_by_identities(
        &self,
        keys: &[IdentityKey],
    ) -> Result<Vec<ExistingRecordRef>, StoreError> {
        (**self).find_by_identities(keys).await
    }

    async fn keys_collected_since(
        &self,
        source_api: &str,
        since: DateTime<Utc>,
    ) -> Result<HashSet<IdentityKey>, StoreError> {
        (**self).keys_collected_since(source_api, since).await
    }

    async fn insert(&self, place: NewPlace) -> Result<ExistingRecordRef, StoreError> {
        (**self).insert(place).await
    }

    async fn touch_collected_at(
        &self,
        key: &IdentityKey,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        (**self).touch_collected_at(key, at).await
    }
}
