//! Core types and events for chunk-assembler

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Key identifying one logical transfer: an opaque client-supplied session
/// identifier plus the slash-separated relative path of the file being
/// uploaded.
///
/// All per-transfer state (chunk directory, completion tracking, merge
/// serialization) is scoped to this pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferKey {
    /// Opaque string grouping chunks of the same upload session
    pub identifier: String,
    /// Client-supplied folder-qualified path of the final file
    pub relative_path: String,
}

impl TransferKey {
    /// Create a new transfer key
    pub fn new(identifier: impl Into<String>, relative_path: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            relative_path: relative_path.into(),
        }
    }
}

impl fmt::Display for TransferKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.identifier, self.relative_path)
    }
}

/// One incoming chunk request, as delivered by the HTTP layer
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChunkUpload {
    /// Opaque transfer identifier
    pub identifier: String,

    /// Relative path of the final file, preserving folder structure
    pub relative_path: String,

    /// Leaf file name; may differ from the leaf of `relative_path`
    pub filename: String,

    /// This chunk's position, in `[1, total_chunks]`
    pub chunk_number: u32,

    /// Total number of chunks in the transfer
    pub total_chunks: u32,

    /// Nominal size of a non-final chunk in bytes (informational)
    pub chunk_size: u64,

    /// Actual size of this chunk's payload in bytes (informational)
    pub current_chunk_size: u64,

    /// Total size of the assembled file in bytes (informational)
    pub total_size: u64,
}

impl ChunkUpload {
    /// The transfer this chunk belongs to
    pub fn key(&self) -> TransferKey {
        TransferKey::new(&self.identifier, &self.relative_path)
    }

    /// Validate required fields and the chunk-number range.
    ///
    /// The HTTP layer rejects absent fields before parsing; this re-checks
    /// empties for library callers and enforces `1 <= chunk_number <= total_chunks`.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("identifier", &self.identifier),
            ("relativePath", &self.relative_path),
            ("filename", &self.filename),
        ] {
            if value.trim().is_empty() {
                return Err(Error::MissingParameter { name: name.into() });
            }
        }
        if self.chunk_number == 0 || self.chunk_number > self.total_chunks {
            return Err(Error::ChunkOutOfRange {
                number: self.chunk_number,
                total: self.total_chunks,
            });
        }
        Ok(())
    }
}

/// Outcome of accepting one chunk
#[derive(Clone, Debug)]
pub struct ChunkReceipt {
    /// The accepted chunk's number
    pub chunk_number: u32,

    /// Where the chunk's bytes were stored
    pub stored_path: PathBuf,

    /// Whether this arrival completed the transfer's chunk set.
    ///
    /// The completion signal is handed to exactly one arrival per transfer;
    /// the holder is expected to request a merge.
    pub need_merge: bool,
}

/// A request to merge a completed transfer into its final artifact
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    /// Opaque transfer identifier
    pub identifier: String,

    /// Relative path of the final file, preserving folder structure
    pub relative_path: String,

    /// Leaf file name the chunks were stored under
    pub filename: String,

    /// Total number of chunks expected
    pub total_chunks: u32,
}

impl MergeRequest {
    /// The transfer this request targets
    pub fn key(&self) -> TransferKey {
        TransferKey::new(&self.identifier, &self.relative_path)
    }

    /// Validate required fields
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("identifier", &self.identifier),
            ("relativePath", &self.relative_path),
            ("filename", &self.filename),
        ] {
            if value.trim().is_empty() {
                return Err(Error::MissingParameter { name: name.into() });
            }
        }
        if self.total_chunks == 0 {
            return Err(Error::MissingParameter {
                name: "totalChunks".into(),
            });
        }
        Ok(())
    }
}

/// A successfully merged artifact
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalArtifact {
    /// Absolute path of the merged file on disk
    #[schema(value_type = String)]
    pub path: PathBuf,

    /// Path relative to the final storage root, preserving the uploaded
    /// folder structure; the leaf may carry a collision-avoidance suffix
    pub relative_path: String,

    /// Size of the merged file in bytes
    pub size_bytes: u64,

    /// URL path the artifact is retrievable under
    pub url: String,

    /// When the merge completed
    pub completed_at: DateTime<Utc>,
}

/// Notifications emitted over the assembler's broadcast channel
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    /// A chunk was persisted
    ChunkStored {
        /// Transfer identifier
        identifier: String,
        /// Relative path of the file being uploaded
        relative_path: String,
        /// The stored chunk's number
        chunk_number: u32,
        /// The transfer's declared total chunk count
        total_chunks: u32,
    },

    /// All chunks of a transfer are present on storage
    TransferComplete {
        /// Transfer identifier
        identifier: String,
        /// Relative path of the file being uploaded
        relative_path: String,
        /// The transfer's declared total chunk count
        total_chunks: u32,
    },

    /// A merge finished and the artifact is available
    MergeCompleted {
        /// Transfer identifier
        identifier: String,
        /// Relative path of the merged artifact under the final root
        relative_path: String,
        /// Size of the merged artifact in bytes
        size_bytes: u64,
    },

    /// A merge was attempted and failed
    MergeFailed {
        /// Transfer identifier
        identifier: String,
        /// Relative path of the file being uploaded
        relative_path: String,
        /// Human-readable failure description
        reason: String,
    },
}
