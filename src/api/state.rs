//! Application state for the API server

use crate::{Config, UploadAssembler};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned per request (cheap Arc clones); provides access to the assembler
/// and the configuration.
#[derive(Clone)]
pub struct AppState {
    /// The core assembler instance
    pub assembler: Arc<UploadAssembler>,

    /// Configuration (read access)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(assembler: Arc<UploadAssembler>, config: Arc<Config>) -> Self {
        Self { assembler, config }
    }
}
