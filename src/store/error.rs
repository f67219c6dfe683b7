use thiserror::Error;

use crate::dedup::IdentityKey;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("store query failed: {0}")]
    Query(String),

    #[error("identity key already stored: {0}")]
    UniqueViolation(IdentityKey),

    #[error("unsupported store file version: {0}")]
    UnsupportedVersion(u32),

    #[error("store file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    /// True when an insert lost a race against another writer of the same key
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(_))
    }
}
