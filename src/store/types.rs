use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dedup::{Identified, IdentityKey};

/// Store-side projection of a known record: local id and last collection time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingRecordRef {
    pub id: String,
    pub public_data_id: String,
    pub source_api: String,
    pub collected_at: DateTime<Utc>,
}

impl Identified for ExistingRecordRef {
    fn public_data_id(&self) -> &str {
        &self.public_data_id
    }

    fn source_api(&self) -> &str {
        &self.source_api
    }
}

/// A record about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlace {
    pub key: IdentityKey,
    pub collected_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

/// Full row as kept by [`JsonStore`](super::JsonStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPlace {
    pub id: String,
    pub public_data_id: String,
    pub source_api: String,
    pub created_at: DateTime<Utc>,
    pub collected_at: DateTime<Utc>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl StoredPlace {
    pub fn key(&self) -> IdentityKey {
        IdentityKey::new(&self.public_data_id, &self.source_api)
    }

    pub fn to_ref(&self) -> ExistingRecordRef {
        ExistingRecordRef {
            id: self.id.clone(),
            public_data_id: self.public_data_id.clone(),
            source_api: self.source_api.clone(),
            collected_at: self.collected_at,
        }
    }
}
