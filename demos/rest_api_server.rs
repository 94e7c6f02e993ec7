//! REST API server example
//!
//! This example shows how to run chunk-assembler with the REST API enabled,
//! accepting chunk uploads over HTTP.
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:8090/swagger-ui
//! - Upload chunks via POST http://localhost:8090/uploads/chunks
//! - Merge a transfer via POST http://localhost:8090/uploads/merge
//! - Stream events via GET http://localhost:8090/events
//! - Fetch merged files under http://localhost:8090/files/

use chunk_assembler::UploadAssembler;
use chunk_assembler::api::start_api_server;
use chunk_assembler::config::{ApiConfig, Config, StorageConfig};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    // Configure API
    let api_config = ApiConfig {
        bind_address: "127.0.0.1:8090".parse::<SocketAddr>()?,
        cors_enabled: true,
        cors_origins: vec!["*".to_string()],
        swagger_ui: true,
        ..Default::default()
    };

    // Build configuration
    let config = Config {
        storage: StorageConfig {
            chunk_root: "data/chunks".into(),
            final_root: "data/uploads".into(),
            ..Default::default()
        },
        api: api_config,
    };

    // Create assembler instance
    let assembler = Arc::new(UploadAssembler::new(config.clone()).await?);
    let config_arc = Arc::new(config);

    println!("🚀 Starting chunk-assembler REST API server");
    println!("📖 Swagger UI: http://localhost:8090/swagger-ui");
    println!("🔄 Events stream: http://localhost:8090/events");
    println!();
    println!("Example commands:");
    println!("  # Upload the only chunk of a one-chunk transfer");
    println!("  curl -X POST http://localhost:8090/uploads/chunks \\");
    println!("    -F identifier=demo -F relativePath=docs/hello.txt \\");
    println!("    -F filename=hello.txt -F chunkNumber=1 -F totalChunks=1 \\");
    println!("    -F chunkSize=5 -F currentChunkSize=5 -F totalSize=5 \\");
    println!("    -F file=@hello.txt");
    println!();
    println!("  # Merge it into the final artifact");
    println!("  curl -X POST http://localhost:8090/uploads/merge \\");
    println!("    -H 'Content-Type: application/json' \\");
    println!(
        "    -d '{{\"identifier\": \"demo\", \"relativePath\": \"docs/hello.txt\", \"filename\": \"hello.txt\", \"totalChunks\": 1}}'"
    );
    println!();
    println!("  # Stream events (Server-Sent Events)");
    println!("  curl -N http://localhost:8090/events");

    // Start the API server (runs indefinitely)
    start_api_server(assembler, config_arc).await?;

    Ok(())
}
