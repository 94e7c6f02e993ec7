//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`uploads`] — Chunk ingest and merge
//! - [`system`] — Health, events, OpenAPI

mod system;
mod uploads;

// Re-export all handlers so `routes::function_name` continues to work
pub use system::*;
pub use uploads::*;
