//! Core assembler facade
//!
//! [`UploadAssembler`] owns the path resolver, chunk store, transfer
//! tracker, and merge engine, and is the single entry point the API layer
//! (or an embedding application) talks to.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::chunk_store::ChunkStore;
use crate::config::Config;
use crate::error::Result;
use crate::merge::MergeEngine;
use crate::paths::PathResolver;
use crate::tracker::TransferTracker;
use crate::types::{ChunkReceipt, ChunkUpload, Event, FinalArtifact, MergeRequest};

/// Assembles chunked uploads into final artifacts.
///
/// Create one per storage configuration and share it behind an [`Arc`];
/// all operations take `&self` and are safe to call concurrently.
pub struct UploadAssembler {
    /// The active configuration
    pub config: Arc<Config>,
    store: ChunkStore,
    tracker: Arc<TransferTracker>,
    merger: MergeEngine,
    events: broadcast::Sender<Event>,
}

impl UploadAssembler {
    /// Create an assembler, validating the configuration and creating both
    /// storage roots.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        tokio::fs::create_dir_all(config.chunk_root()).await?;
        tokio::fs::create_dir_all(config.final_root()).await?;

        let resolver = Arc::new(PathResolver::new(
            config.chunk_root().clone(),
            config.final_root().clone(),
        ));
        let tracker = Arc::new(TransferTracker::new(resolver.clone()));
        let store = ChunkStore::new(resolver.clone());
        let merger = MergeEngine::new(config.clone(), resolver, tracker.clone());
        let (events, _) = broadcast::channel(config.api.event_channel_capacity);

        tracing::info!(
            chunk_root = %config.chunk_root().display(),
            final_root = %config.final_root().display(),
            "upload assembler ready"
        );

        Ok(Self {
            config,
            store,
            tracker,
            merger,
            events,
        })
    }

    /// Subscribe to assembler events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Accept one chunk: validate, persist, record the arrival, and report
    /// whether the transfer is now complete.
    ///
    /// The `need_merge` flag in the receipt is handed to exactly one chunk
    /// request per transfer; its caller is expected to follow up with
    /// [`merge`](UploadAssembler::merge).
    pub async fn handle_chunk(&self, upload: &ChunkUpload, bytes: &[u8]) -> Result<ChunkReceipt> {
        upload.validate()?;

        let stored_path = self.store.put(upload, bytes).await?;
        let need_merge = self.tracker.record_arrival(upload).await?;

        self.emit(Event::ChunkStored {
            identifier: upload.identifier.clone(),
            relative_path: upload.relative_path.clone(),
            chunk_number: upload.chunk_number,
            total_chunks: upload.total_chunks,
        });
        if need_merge {
            tracing::info!(
                identifier = %upload.identifier,
                relative_path = %upload.relative_path,
                total_chunks = upload.total_chunks,
                "all chunks present"
            );
            self.emit(Event::TransferComplete {
                identifier: upload.identifier.clone(),
                relative_path: upload.relative_path.clone(),
                total_chunks: upload.total_chunks,
            });
        }

        Ok(ChunkReceipt {
            chunk_number: upload.chunk_number,
            stored_path,
            need_merge,
        })
    }

    /// Merge a completed transfer into its final artifact
    pub async fn merge(&self, request: &MergeRequest) -> Result<FinalArtifact> {
        match self.merger.merge(request).await {
            Ok(artifact) => {
                self.emit(Event::MergeCompleted {
                    identifier: request.identifier.clone(),
                    relative_path: artifact.relative_path.clone(),
                    size_bytes: artifact.size_bytes,
                });
                Ok(artifact)
            }
            Err(err) => {
                self.emit(Event::MergeFailed {
                    identifier: request.identifier.clone(),
                    relative_path: request.relative_path.clone(),
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Spawn the REST API server as a background task
    pub fn spawn_api_server(self: &Arc<Self>) -> JoinHandle<Result<()>> {
        let assembler = self.clone();
        let config = self.config.clone();
        tokio::spawn(async move { crate::api::start_api_server(assembler, config).await })
    }

    fn emit(&self, event: Event) {
        // Send fails only when no subscriber exists, which is fine
        let _ = self.events.send(event);
    }
}
