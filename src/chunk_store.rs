//! Chunk persistence
//!
//! Writes one chunk's bytes under a deterministic name inside the directory
//! [`PathResolver`] supplies. A chunk only becomes visible under its
//! countable name once fully written and renamed into place, so an aborted
//! upload can never satisfy the completeness check.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::paths::{self, PathResolver};
use crate::types::ChunkUpload;

/// Monotonic suffix for in-flight temporary files, so concurrent writers in
/// the same directory never collide on a temp name.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Deterministic on-disk name for a chunk: `stem-chunk-N.ext`.
///
/// Derived purely from the (sanitized) filename and the chunk number, so a
/// re-upload of the same number lands on the same path and the merge can
/// enumerate chunks without a side index.
pub fn chunk_file_name(filename: &str, chunk_number: u32) -> String {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(filename);
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{stem}-chunk-{chunk_number}.{ext}"),
        None => format!("{stem}-chunk-{chunk_number}"),
    }
}

/// Build a uniquely-named dot-prefixed temporary path next to `target`.
pub(crate) fn temp_sibling(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("chunk");
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    target.with_file_name(format!(".{name}.{seq}.part"))
}

/// Persists chunk bytes under deterministic names
#[derive(Debug)]
pub struct ChunkStore {
    resolver: Arc<PathResolver>,
}

impl ChunkStore {
    /// Create a store resolving directories through `resolver`
    pub fn new(resolver: Arc<PathResolver>) -> Self {
        Self { resolver }
    }

    /// Persist one chunk's bytes, returning the stored path.
    ///
    /// The payload is written in full to a temporary name and renamed onto
    /// the deterministic chunk name afterwards; concurrent uploads of the
    /// same chunk number resolve last-write-wins without corrupting other
    /// chunks. Failures leave no visible chunk file behind.
    pub async fn put(&self, upload: &ChunkUpload, bytes: &[u8]) -> Result<PathBuf> {
        let dir = self
            .resolver
            .resolve_chunk_dir(&upload.identifier, &upload.relative_path)
            .await?;
        let leaf = paths::sanitize_leaf(&upload.filename)?;
        let target = dir.join(chunk_file_name(&leaf, upload.chunk_number));

        let temp = temp_sibling(&target);
        if let Err(err) = write_all_synced(&temp, bytes).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(err.into());
        }
        if let Err(err) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(err.into());
        }

        tracing::debug!(
            identifier = %upload.identifier,
            relative_path = %upload.relative_path,
            chunk_number = upload.chunk_number,
            bytes = bytes.len(),
            "stored chunk"
        );
        Ok(target)
    }
}

async fn write_all_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}
