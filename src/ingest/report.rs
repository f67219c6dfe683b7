use chrono::{DateTime, Utc};
use serde::Serialize;

/// How a collection decides which candidates are already known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum CollectMode {
    /// Check every candidate against the whole store
    Full,
    /// Skip the lookup for keys collected after `since`, check the rest in full
    Since { since: DateTime<Utc> },
}

impl CollectMode {
    pub fn describe(&self) -> String {
        match self {
            CollectMode::Full => "full".to_string(),
            CollectMode::Since { since } => format!("since {}", since.to_rfc3339()),
        }
    }
}

/// Counts from one collection run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub source_api: String,
    pub mode: CollectMode,
    pub received: usize,
    pub inserted: usize,
    pub refreshed: usize,
    /// Inserts rejected by the unique key because another writer got there first
    pub raced_duplicates: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl IngestReport {
    pub fn new(source_api: &str, mode: CollectMode, received: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            source_api: source_api.to_string(),
            mode,
            received,
            inserted: 0,
            refreshed: 0,
            raced_duplicates: 0,
            started_at,
            finished_at: started_at,
        }
    }

    /// Records that turned out to be already stored, by any path
    pub fn known(&self) -> usize {
        self.refreshed + self.raced_duplicates
    }
}
