pub mod config;
pub mod dedup;
pub mod ingest;
pub mod output;
pub mod place;
pub mod rank;
pub mod scoring;
pub mod store;

pub use dedup::{Deduplicator, DuplicateCheckResult, FilterResult, IdentityKey};
pub use place::{PlaceRecord, PlaceSignal, PolicyLevel, WeatherSignal};
pub use scoring::{calculate_score, compute_score, ScoreResult};
