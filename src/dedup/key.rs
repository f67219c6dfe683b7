use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the two halves of a map key. Source identifiers never contain it.
pub const KEY_SEPARATOR: char = '|';

/// Natural identity of a source record: unique per row in the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityKey {
    pub public_data_id: String,
    pub source_api: String,
}

impl IdentityKey {
    pub fn new(public_data_id: impl Into<String>, source_api: impl Into<String>) -> Self {
        Self {
            public_data_id: public_data_id.into(),
            source_api: source_api.into(),
        }
    }

    /// Flat string form used as the key of batch results: "{publicDataId}|{sourceApi}"
    pub fn map_key(&self) -> String {
        format!("{}{}{}", self.public_data_id, KEY_SEPARATOR, self.source_api)
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.public_data_id, KEY_SEPARATOR, self.source_api)
    }
}

/// Anything carrying the two identity fields can be deduplicated.
pub trait Identified {
    fn public_data_id(&self) -> &str;
    fn source_api(&self) -> &str;

    fn identity(&self) -> IdentityKey {
        IdentityKey::new(self.public_data_id(), self.source_api())
    }
}

impl Identified for IdentityKey {
    fn public_data_id(&self) -> &str {
        &self.public_data_id
    }

    fn source_api(&self) -> &str {
        &self.source_api
    }

    fn identity(&self) -> IdentityKey {
        self.clone()
    }
}

/// A place observation fetched from an external feed.
///
/// Only the identity fields are interpreted; every other field of the source
/// record is carried through untouched in `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord<P = serde_json::Map<String, serde_json::Value>> {
    pub public_data_id: String,
    pub source_api: String,
    #[serde(flatten)]
    pub payload: P,
}

impl<P> Identified for CandidateRecord<P> {
    fn public_data_id(&self) -> &str {
        &self.public_data_id
    }

    fn source_api(&self) -> &str {
        &self.source_api
    }
}
