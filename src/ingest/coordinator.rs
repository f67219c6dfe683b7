use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::report::{CollectMode, IngestReport};
use crate::dedup::{Deduplicator, Identified, IdentityKey};
use crate::store::{NewPlace, PlaceStore, StoreError};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("a collection is already running (requested for {0})")]
    AlreadyRunning(String),

    #[error("record {key} does not belong to source {expected}")]
    SourceMismatch { key: IdentityKey, expected: String },

    #[error("failed to encode record {key}: {source}")]
    Encode {
        key: IdentityKey,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Held while a collection runs; dropping it lets the next run start.
pub struct RunGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

/// Runs collections for external feeds against one store.
///
/// At most one collection runs at a time per coordinator. A second request
/// while one is in progress is rejected rather than queued.
pub struct IngestCoordinator<S> {
    dedup: Deduplicator<S>,
    running: Mutex<()>,
}

impl<S: PlaceStore> IngestCoordinator<S> {
    pub fn new(dedup: Deduplicator<S>) -> Self {
        Self {
            dedup,
            running: Mutex::new(()),
        }
    }

    pub fn deduplicator(&self) -> &Deduplicator<S> {
        &self.dedup
    }

    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// Claim the run slot without waiting.
    pub fn try_begin(&self, source_api: &str) -> Result<RunGuard<'_>, IngestError> {
        self.running
            .try_lock()
            .map(|guard| RunGuard { _guard: guard })
            .map_err(|_| IngestError::AlreadyRunning(source_api.to_string()))
    }

    /// Collect one batch from `source_api`.
    ///
    /// New records are inserted with `collected_at = now`; known records get
    /// their `collected_at` refreshed. An insert rejected by the unique key
    /// means a concurrent writer stored the record first, so it is counted
    /// as a raced duplicate and refreshed instead of failing the run.
    pub async fn collect<R>(
        &self,
        source_api: &str,
        records: Vec<R>,
        mode: CollectMode,
        now: DateTime<Utc>,
    ) -> Result<IngestReport, IngestError>
    where
        R: Identified + Serialize,
    {
        let _run = self.try_begin(source_api)?;

        if let Some(stray) = records.iter().find(|r| r.source_api() != source_api) {
            return Err(IngestError::SourceMismatch {
                key: stray.identity(),
                expected: source_api.to_string(),
            });
        }

        let started_at = Utc::now();
        let mut report = IngestReport::new(source_api, mode, records.len(), started_at);
        info!(source_api, mode = %mode.describe(), received = records.len(), "collection started");

        let partition = match mode {
            CollectMode::Full => self.dedup.filter_new_places(records).await?,
            CollectMode::Since { since } => {
                self.dedup
                    .get_new_places_since(source_api, since, records)
                    .await?
            }
        };

        let store = self.dedup.store();

        for record in &partition.new_places {
            let key = record.identity();
            let payload = serde_json::to_value(record).map_err(|source| IngestError::Encode {
                key: key.clone(),
                source,
            })?;

            let place = NewPlace {
                key: key.clone(),
                collected_at: now,
                payload,
            };
            match store.insert(place).await {
                Ok(inserted) => {
                    debug!(%key, id = %inserted.id, "inserted");
                    report.inserted += 1;
                }
                Err(e) if e.is_unique_violation() => {
                    debug!(%key, "insert lost to a concurrent writer");
                    report.raced_duplicates += 1;
                    store.touch_collected_at(&key, now).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        for record in &partition.existing_places {
            let key = record.identity();
            if store.touch_collected_at(&key, now).await? {
                report.refreshed += 1;
            } else {
                warn!(%key, "known record vanished before refresh");
            }
        }

        report.finished_at = Utc::now();
        info!(
            source_api,
            inserted = report.inserted,
            refreshed = report.refreshed,
            raced = report.raced_duplicates,
            "collection finished"
        );
        Ok(report)
    }
}
