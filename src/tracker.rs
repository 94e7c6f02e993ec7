//! Per-transfer completion tracking
//!
//! Completeness is decided by probing storage for every expected chunk file,
//! never by the position of the chunk that happens to be arriving — clients
//! upload out of order and in parallel, so the final chunk number says
//! nothing about the rest of the set.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::chunk_store::chunk_file_name;
use crate::error::Result;
use crate::paths::{self, PathResolver};
use crate::types::{ChunkUpload, TransferKey};

/// In-memory state retained per transfer between chunk arrivals
#[derive(Debug, Default)]
struct TransferState {
    /// Total size the client reported during upload, for merge reconciliation
    reported_total_size: Option<u64>,
    /// Whether a completion signal has already been handed out
    merge_signaled: bool,
}

/// Tracks which transfers have a full chunk set on storage
#[derive(Debug)]
pub struct TransferTracker {
    resolver: Arc<PathResolver>,
    transfers: RwLock<HashMap<TransferKey, TransferState>>,
}

impl TransferTracker {
    /// Create a tracker probing chunk directories through `resolver`
    pub fn new(resolver: Arc<PathResolver>) -> Self {
        Self {
            resolver,
            transfers: RwLock::new(HashMap::new()),
        }
    }

    /// Record one chunk arrival and report whether it completed the set.
    ///
    /// The completion signal is claimed at most once per transfer: when two
    /// arrivals race and both observe a full set, exactly one caller gets
    /// `true`. A later failed merge re-opens the claim via [`reopen`];
    /// [`merge`](crate::MergeEngine::merge) itself stays callable regardless
    /// of who holds the signal.
    ///
    /// [`reopen`]: TransferTracker::reopen
    pub async fn record_arrival(&self, upload: &ChunkUpload) -> Result<bool> {
        let key = upload.key();

        {
            let mut transfers = self.transfers.write().await;
            let state = transfers.entry(key.clone()).or_default();
            state.reported_total_size = Some(upload.total_size);
        }

        let missing = self
            .missing_chunks(&key, &upload.filename, upload.total_chunks)
            .await?;
        if !missing.is_empty() {
            return Ok(false);
        }

        let mut transfers = self.transfers.write().await;
        let state = transfers.entry(key).or_default();
        if state.merge_signaled {
            Ok(false)
        } else {
            state.merge_signaled = true;
            Ok(true)
        }
    }

    /// Sorted list of chunk numbers in `1..=total_chunks` with no file on
    /// storage. Empty means the transfer is mergeable.
    pub async fn missing_chunks(
        &self,
        key: &TransferKey,
        filename: &str,
        total_chunks: u32,
    ) -> Result<Vec<u32>> {
        let dir = self
            .resolver
            .resolve_chunk_dir(&key.identifier, &key.relative_path)
            .await?;
        let leaf = paths::sanitize_leaf(filename)?;

        let mut missing = Vec::new();
        for number in 1..=total_chunks {
            let path = dir.join(chunk_file_name(&leaf, number));
            match tokio::fs::metadata(&path).await {
                Ok(_) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => missing.push(number),
                Err(err) => return Err(err.into()),
            }
        }
        Ok(missing)
    }

    /// Total size the client reported for this transfer, if any chunk has
    /// arrived since startup
    pub async fn reported_total_size(&self, key: &TransferKey) -> Option<u64> {
        self.transfers
            .read()
            .await
            .get(key)
            .and_then(|state| state.reported_total_size)
    }

    /// Re-open the completion claim after a failed merge so a later arrival
    /// (e.g. a resubmitted missing chunk) can signal again
    pub async fn reopen(&self, key: &TransferKey) {
        if let Some(state) = self.transfers.write().await.get_mut(key) {
            state.merge_signaled = false;
        }
    }

    /// Drop all tracking state for a merged transfer
    pub async fn forget(&self, key: &TransferKey) {
        self.transfers.write().await.remove(key);
    }
}
