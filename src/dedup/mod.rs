pub mod checker;
pub mod key;

pub use checker::{
    Deduplicator, DuplicateCheckResult, FilterResult, DEFAULT_CHUNK_SIZE,
    DEFAULT_MAX_CONCURRENT_LOOKUPS,
};
pub use key::{CandidateRecord, Identified, IdentityKey, KEY_SEPARATOR};
