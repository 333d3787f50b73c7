//! Bulk dataset synchronization.
//!
//! Mirrors a named bulk dataset into one or more destination namespaces by
//! way of the network API, so a sync run is subject to the same contract
//! and rate-limit rules as ordinary traffic. Each run is a full replace:
//! destinations are cleared first, and a failure mid-run leaves them in
//! whatever partial state the aborted run produced. Re-running the job is
//! the recovery path.

pub mod chunk;
pub mod client;

pub use chunk::chunk;
pub use client::{BulkApi, HttpBulkClient};

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;
use serde::Serialize;
use thiserror::Error;

use crate::store::{list_all_keys, KvStore, StoreError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("bulk API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("bulk API transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid bulk API url: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Destination {
    pub name: String,
    pub store: Arc<dyn KvStore>,
}

#[derive(Debug, Serialize)]
pub struct SyncReport {
    /// Correlates the report with this run's log lines.
    pub run_id: uuid::Uuid,
    pub dataset: String,
    pub keys_synced: usize,
    pub chunks: usize,
    pub destinations: Vec<String>,
}

pub struct SyncJob {
    api: Arc<dyn BulkApi>,
    destinations: Vec<Destination>,
    chunk_size: usize,
}

impl SyncJob {
    pub fn new(api: Arc<dyn BulkApi>, chunk_size: usize) -> Self {
        Self {
            api,
            destinations: Vec::new(),
            chunk_size,
        }
    }

    pub fn with_destination(mut self, name: impl Into<String>, store: Arc<dyn KvStore>) -> Self {
        self.destinations.push(Destination {
            name: name.into(),
            store,
        });
        self
    }

    /// Run one full sync. Steps run sequentially and each completes before
    /// the next begins; only the per-chunk value fetches inside step 4 are
    /// concurrent. Any failure aborts the remaining steps and surfaces the
    /// originating error.
    pub async fn run(&self, dataset: &str) -> Result<SyncReport, SyncError> {
        let run_id = uuid::Uuid::new_v4();
        tracing::info!(
            run_id = %run_id,
            dataset = %dataset,
            destinations = self.destinations.len(),
            "sync starting"
        );

        // Step 1: full replace - clear every destination first.
        for destination in &self.destinations {
            let stale = list_all_keys(destination.store.as_ref(), None).await?;
            destination.store.delete_bulk(&stale).await?;
            tracing::info!(
                destination = %destination.name,
                deleted = stale.len(),
                "destination cleared"
            );
        }

        // Step 2: authoritative key list, one call.
        let keys = self.api.list_keys(dataset).await?;
        tracing::info!(dataset = %dataset, keys = keys.len(), "key list fetched");

        // Step 3: partition.
        let chunks = chunk(&keys, self.chunk_size)?;
        tracing::info!(chunks = chunks.len(), chunk_size = self.chunk_size, "key list partitioned");

        // Step 4: fetch chunk values concurrently, flatten before writing.
        // One failed chunk aborts the whole run; no partial dataset.
        let fetches = chunks
            .iter()
            .map(|chunk_keys| self.api.fetch_values(dataset, chunk_keys));
        let fetched = try_join_all(fetches).await?;

        let mut values: HashMap<String, String> = HashMap::new();
        for map in fetched {
            values.extend(map);
        }
        tracing::info!(values = values.len(), "chunk values fetched");

        // Step 5: one bulk write per destination, in key-list order.
        let pairs: Vec<(String, String)> = keys
            .iter()
            .filter_map(|k| values.get(k).map(|v| (k.clone(), v.clone())))
            .collect();
        for destination in &self.destinations {
            destination.store.put_bulk(&pairs).await?;
            tracing::info!(
                destination = %destination.name,
                written = pairs.len(),
                "destination written"
            );
        }

        Ok(SyncReport {
            run_id,
            dataset: dataset.to_string(),
            keys_synced: pairs.len(),
            chunks: chunks.len(),
            destinations: self
                .destinations
                .iter()
                .map(|d| d.name.clone())
                .collect(),
        })
    }
}
