//! Multiple event subscribers example
//!
//! This example demonstrates how multiple parts of your application
//! can independently subscribe to assembler events.

use chunk_assembler::config::{Config, StorageConfig};
use chunk_assembler::{Event, UploadAssembler};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let config = Config {
        storage: StorageConfig {
            chunk_root: "data/chunks".into(),
            final_root: "data/uploads".into(),
            ..Default::default()
        },
        ..Default::default()
    };

    let assembler = Arc::new(UploadAssembler::new(config).await?);

    // UI subscriber - only cares about upload progress
    let mut ui_events = assembler.subscribe();
    tokio::spawn(async move {
        println!("[UI] Starting UI event subscriber");
        while let Ok(event) = ui_events.recv().await {
            match event {
                Event::ChunkStored {
                    identifier,
                    chunk_number,
                    total_chunks,
                    ..
                } => {
                    // Update progress bar
                    println!("[UI] Transfer {identifier}: chunk {chunk_number}/{total_chunks}");
                }
                Event::MergeCompleted {
                    relative_path,
                    size_bytes,
                    ..
                } => {
                    println!("[UI] Finished {relative_path} ({size_bytes} bytes)");
                }
                _ => {}
            }
        }
    });

    // Logging subscriber - logs everything
    let mut log_events = assembler.subscribe();
    tokio::spawn(async move {
        println!("[LOG] Starting logging subscriber");
        while let Ok(event) = log_events.recv().await {
            println!("[LOG] Event: {:?}", event);
        }
    });

    // Notification subscriber - only cares about completion/failure
    let mut notification_events = assembler.subscribe();
    tokio::spawn(async move {
        println!("[NOTIFY] Starting notification subscriber");
        while let Ok(event) = notification_events.recv().await {
            match event {
                Event::MergeCompleted {
                    identifier,
                    relative_path,
                    ..
                } => {
                    println!("[NOTIFY] Sending success notification for transfer {identifier}");
                    // Send push notification, email, webhook, etc.
                    println!("[NOTIFY] Upload complete: {relative_path}");
                }
                Event::MergeFailed {
                    identifier, reason, ..
                } => {
                    println!("[NOTIFY] Sending failure notification for transfer {identifier}");
                    println!("[NOTIFY] Error: {reason}");
                }
                _ => {}
            }
        }
    });

    // Statistics subscriber - collects metrics
    let mut stats_events = assembler.subscribe();
    tokio::spawn(async move {
        println!("[STATS] Starting statistics collector");
        let mut bytes_assembled: u64 = 0;
        let mut completed_count: u32 = 0;
        let mut failed_count: u32 = 0;

        while let Ok(event) = stats_events.recv().await {
            match event {
                Event::MergeCompleted { size_bytes, .. } => {
                    completed_count += 1;
                    bytes_assembled += size_bytes;
                    println!(
                        "[STATS] Total completed: {} (failed: {}), {} bytes assembled",
                        completed_count, failed_count, bytes_assembled
                    );
                }
                Event::MergeFailed { .. } => {
                    failed_count += 1;
                }
                _ => {}
            }
        }
    });

    println!("✓ All subscribers started");
    println!("Serving the REST API...");

    // Keep the program running to process events
    let server = assembler.spawn_api_server();
    chunk_assembler::run_with_shutdown().await;
    server.abort();

    Ok(())
}
