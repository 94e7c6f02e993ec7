//! # chunk-assembler
//!
//! Backend library for assembling chunked folder uploads into final
//! artifacts.
//!
//! Clients split a file into numbered byte ranges and upload them
//! independently, in any order and concurrently, alongside a relative path
//! that preserves the original folder hierarchy. chunk-assembler persists
//! each chunk safely, detects when a transfer's set is complete without
//! trusting arrival order, and streams the chunks back together into one
//! collision-safe file under the final storage root.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - The core is an embeddable [`UploadAssembler`];
//!   the bundled REST API is a thin wiring layer over it
//! - **Safe under races** - Duplicate, concurrent, and out-of-order chunk
//!   deliveries are all valid; merges are serialized per transfer
//! - **Sandboxed** - Client-supplied paths can never escape the configured
//!   storage roots
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use chunk_assembler::{Config, UploadAssembler};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let assembler = Arc::new(UploadAssembler::new(Config::default()).await?);
//!
//!     // Subscribe to events
//!     let mut events = assembler.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     // Serve the REST API until a termination signal arrives
//!     let server = assembler.spawn_api_server();
//!     chunk_assembler::run_with_shutdown().await;
//!     server.abort();
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Core assembler facade
pub mod assembler;
/// Chunk persistence
pub mod chunk_store;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Merge reassembly
pub mod merge;
/// Sandboxed path resolution
pub mod paths;
/// Per-transfer completion tracking
pub mod tracker;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use assembler::UploadAssembler;
pub use chunk_store::ChunkStore;
pub use config::{ApiConfig, Config, StorageConfig};
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus};
pub use merge::MergeEngine;
pub use paths::PathResolver;
pub use tracker::TransferTracker;
pub use types::{
    ChunkReceipt, ChunkUpload, Event, FinalArtifact, MergeRequest, TransferKey,
};

/// Wait for a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal
///   registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown() {
    wait_for_signal().await;
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
