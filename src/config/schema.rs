use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::scoring::ScoringConfig;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Store file (default: ~/.config/odog/places.json)
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Identity pairs per store query during batch checks (default: 100)
    #[serde(default)]
    pub batch_chunk_size: Option<usize>,

    /// Chunk queries in flight at once (default: 4)
    #[serde(default)]
    pub max_concurrent_lookups: Option<usize>,

    #[serde(default)]
    pub scoring: Option<ScoringConfig>,
}
