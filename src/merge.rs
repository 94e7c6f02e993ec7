//! Merge reassembly
//!
//! Streams the chunks of a completed transfer, in ascending chunk-number
//! order, into one final artifact. Merges are serialized per transfer key:
//! a second merge request for the same transfer waits on the first and is
//! handed its result instead of re-merging.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::chunk_store::{chunk_file_name, temp_sibling};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::paths::{self, PathResolver};
use crate::tracker::TransferTracker;
use crate::types::{FinalArtifact, MergeRequest, TransferKey};

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Per-transfer merge state: the lock serializes physical merges, the slot
/// caches the artifact so a racing second request coalesces into it.
#[derive(Debug, Default)]
struct MergeSlot {
    result: Option<FinalArtifact>,
}

/// Reassembles completed transfers into final artifacts
#[derive(Debug)]
pub struct MergeEngine {
    config: Arc<Config>,
    resolver: Arc<PathResolver>,
    tracker: Arc<TransferTracker>,
    slots: Mutex<HashMap<TransferKey, Arc<Mutex<MergeSlot>>>>,
}

impl MergeEngine {
    /// Create a merge engine over the shared resolver and tracker
    pub fn new(
        config: Arc<Config>,
        resolver: Arc<PathResolver>,
        tracker: Arc<TransferTracker>,
    ) -> Self {
        Self {
            config,
            resolver,
            tracker,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Merge a completed transfer into its final artifact.
    ///
    /// Re-verifies completeness under the transfer's merge lock before any
    /// byte is written; an incomplete set fails with
    /// [`IncompleteTransfer`](Error::IncompleteTransfer) carrying the exact
    /// missing chunk numbers. A concurrent merge of the same transfer
    /// receives the first merge's artifact instead of running again.
    pub async fn merge(&self, request: &MergeRequest) -> Result<FinalArtifact> {
        request.validate()?;
        let key = request.key();

        let slot = {
            let mut slots = self.slots.lock().await;
            slots.entry(key.clone()).or_default().clone()
        };
        let mut slot = slot.lock().await;

        if let Some(artifact) = &slot.result {
            tracing::debug!(
                identifier = %key.identifier,
                relative_path = %key.relative_path,
                "coalescing merge request into previous result"
            );
            return Ok(artifact.clone());
        }

        match self.run_merge(request, &key).await {
            Ok(artifact) => {
                self.tracker.forget(&key).await;
                slot.result = Some(artifact.clone());
                Ok(artifact)
            }
            Err(err) => {
                // Let a resubmitted chunk (or a retry) signal completion again
                self.tracker.reopen(&key).await;
                Err(err)
            }
        }
    }

    async fn run_merge(&self, request: &MergeRequest, key: &TransferKey) -> Result<FinalArtifact> {
        let missing = self
            .tracker
            .missing_chunks(key, &request.filename, request.total_chunks)
            .await?;
        if !missing.is_empty() {
            return Err(Error::IncompleteTransfer { missing });
        }

        let chunk_dir = self
            .resolver
            .resolve_chunk_dir(&key.identifier, &key.relative_path)
            .await?;
        let final_dir = self.resolver.resolve_final_dir(&key.relative_path).await?;
        let leaf = paths::sanitize_leaf(&request.filename)?;

        let destination = unique_destination(&final_dir, &leaf)?;
        let temp = temp_sibling(&destination);

        let assembled = match stream_chunks(&chunk_dir, &leaf, request.total_chunks, &temp).await {
            Ok(bytes) => bytes,
            Err(err) => {
                let _ = tokio::fs::remove_file(&temp).await;
                return Err(err);
            }
        };

        if let Some(expected) = self.tracker.reported_total_size(key).await
            && expected != assembled
        {
            if self.config.storage.strict_size_check {
                let _ = tokio::fs::remove_file(&temp).await;
                return Err(Error::SizeMismatch {
                    expected,
                    actual: assembled,
                });
            }
            tracing::warn!(
                identifier = %key.identifier,
                relative_path = %key.relative_path,
                expected_bytes = expected,
                assembled_bytes = assembled,
                "assembled size disagrees with reported total size"
            );
        }

        if let Err(err) = tokio::fs::rename(&temp, &destination).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(err.into());
        }

        if self.config.storage.remove_chunks_after_merge {
            self.cleanup_chunks(key, &chunk_dir, &leaf, request.total_chunks)
                .await;
        }

        let final_name = destination
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&leaf)
            .to_string();
        let relative_path = artifact_relative_path(&key.relative_path, &final_name)?;

        tracing::info!(
            identifier = %key.identifier,
            relative_path = %relative_path,
            size_bytes = assembled,
            total_chunks = request.total_chunks,
            "merged transfer into final artifact"
        );

        Ok(FinalArtifact {
            url: format!("/files/{relative_path}"),
            path: destination,
            relative_path,
            size_bytes: assembled,
            completed_at: Utc::now(),
        })
    }

    /// Delete this transfer's chunk files, then prune the directory if it is
    /// now empty. Scoped to the one transfer: a sibling transfer sharing the
    /// same directory keeps its chunks. Failures are logged, not fatal.
    async fn cleanup_chunks(
        &self,
        key: &TransferKey,
        chunk_dir: &Path,
        leaf: &str,
        total_chunks: u32,
    ) {
        for number in 1..=total_chunks {
            let path = chunk_dir.join(chunk_file_name(leaf, number));
            if let Err(err) = tokio::fs::remove_file(&path).await
                && err.kind() != ErrorKind::NotFound
            {
                tracing::warn!(
                    identifier = %key.identifier,
                    chunk_number = number,
                    error = %err,
                    "failed to remove merged chunk"
                );
            }
        }
        // Empty directories only; a non-empty directory still holds a
        // sibling transfer's chunks and must stay.
        let _ = tokio::fs::remove_dir(chunk_dir).await;
    }
}

/// Stream the chunks `1..=total_chunks` into `output`, one chunk fully
/// flushed before the next, returning the assembled byte count.
async fn stream_chunks(
    chunk_dir: &Path,
    leaf: &str,
    total_chunks: u32,
    output: &Path,
) -> Result<u64> {
    let mut writer = tokio::fs::File::create(output).await?;
    let mut assembled: u64 = 0;
    for number in 1..=total_chunks {
        let path = chunk_dir.join(chunk_file_name(leaf, number));
        let mut reader = tokio::fs::File::open(&path).await?;
        assembled += tokio::io::copy(&mut reader, &mut writer).await?;
    }
    writer.flush().await?;
    writer.sync_all().await?;
    Ok(assembled)
}

/// Pick a destination that does not collide with any pre-existing file,
/// probing `stem (1).ext`, `stem (2).ext`, ... when the plain name is taken.
fn unique_destination(dir: &Path, leaf: &str) -> Result<PathBuf> {
    let candidate = dir.join(leaf);
    if !candidate.exists() {
        return Ok(candidate);
    }

    let path = Path::new(leaf);
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(leaf);
    let extension = path.extension().and_then(|ext| ext.to_str());

    for i in 1..=MAX_RENAME_ATTEMPTS {
        let name = match extension {
            Some(ext) => format!("{stem} ({i}).{ext}"),
            None => format!("{stem} ({i})"),
        };
        let candidate = dir.join(name);
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(Error::Io(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no collision-free name available for {leaf}"),
    )))
}

/// Relative path of the artifact under the final root, slash-separated
fn artifact_relative_path(relative_path: &str, final_name: &str) -> Result<String> {
    let dir = paths::relative_dir(relative_path)?;
    if dir.as_os_str().is_empty() {
        Ok(final_name.to_string())
    } else {
        Ok(format!("{}/{final_name}", dir.display()))
    }
}
