//! Basic chunked upload example
//!
//! This example demonstrates the core functionality of chunk-assembler:
//! - Configuring storage roots
//! - Creating an assembler instance
//! - Subscribing to events
//! - Uploading chunks out of order
//! - Merging the completed transfer

use chunk_assembler::config::{Config, StorageConfig};
use chunk_assembler::{ChunkUpload, Event, MergeRequest, UploadAssembler};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    // Build configuration
    let config = Config {
        storage: StorageConfig {
            chunk_root: "data/chunks".into(),
            final_root: "data/uploads".into(),
            ..Default::default()
        },
        ..Default::default()
    };

    // Create assembler instance
    let assembler = UploadAssembler::new(config).await?;

    // Subscribe to events
    let mut events = assembler.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::ChunkStored {
                    identifier,
                    chunk_number,
                    total_chunks,
                    ..
                } => {
                    println!("⬆ Stored chunk {chunk_number}/{total_chunks} of {identifier}");
                }
                Event::TransferComplete { identifier, .. } => {
                    println!("✓ Transfer {identifier} complete, ready to merge");
                }
                Event::MergeCompleted {
                    relative_path,
                    size_bytes,
                    ..
                } => {
                    println!("✓ Merged into {relative_path} ({size_bytes} bytes)");
                }
                Event::MergeFailed { reason, .. } => {
                    println!("✗ Merge failed: {reason}");
                }
            }
        }
    });

    // The file "hello world, chunked!" split into three ranges, uploaded
    // deliberately out of order
    let parts: [(u32, &[u8]); 3] = [(2, b"rld, chu"), (3, b"nked!"), (1, b"hello wo")];
    let total_size: u64 = parts.iter().map(|(_, bytes)| bytes.len() as u64).sum();

    for (number, payload) in parts {
        let receipt = assembler
            .handle_chunk(
                &ChunkUpload {
                    identifier: "demo-session".to_string(),
                    relative_path: "greetings/hello.txt".to_string(),
                    filename: "hello.txt".to_string(),
                    chunk_number: number,
                    total_chunks: 3,
                    chunk_size: 8,
                    current_chunk_size: payload.len() as u64,
                    total_size,
                },
                payload,
            )
            .await?;

        if receipt.need_merge {
            let artifact = assembler
                .merge(&MergeRequest {
                    identifier: "demo-session".to_string(),
                    relative_path: "greetings/hello.txt".to_string(),
                    filename: "hello.txt".to_string(),
                    total_chunks: 3,
                })
                .await?;
            println!("Final artifact at {:?}", artifact.path);
        }
    }

    Ok(())
}
