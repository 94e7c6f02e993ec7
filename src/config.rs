//! Configuration types for chunk-assembler

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use utoipa::ToSchema;

/// Storage behavior configuration (roots, cleanup, size policy)
///
/// Groups settings for where chunks and finished artifacts live and how
/// merges treat their inputs. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StorageConfig {
    /// Root directory for in-flight chunk files (default: "./data/chunks")
    ///
    /// Each transfer gets its own subtree: `<chunk_root>/<identifier>/<relative dirs>/`.
    #[serde(default = "default_chunk_root")]
    pub chunk_root: PathBuf,

    /// Root directory for merged artifacts (default: "./data/uploads")
    ///
    /// Mirrors each transfer's relative directory structure directly,
    /// without an identifier subtree.
    #[serde(default = "default_final_root")]
    pub final_root: PathBuf,

    /// Delete a transfer's chunk directory after a successful merge (default: false)
    ///
    /// Keeping chunks around supports retrying a failed client-side flow
    /// without re-uploading. When enabled, only the merged transfer's own
    /// directory is removed, never sibling transfers'.
    #[serde(default)]
    pub remove_chunks_after_merge: bool,

    /// Fail the merge when the assembled byte count disagrees with the
    /// client-reported total size (default: false, mismatches are logged)
    #[serde(default)]
    pub strict_size_check: bool,

    /// Maximum accepted size of a single chunk body in bytes (default: 16 MiB)
    #[serde(default = "default_max_chunk_bytes")]
    pub max_chunk_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            chunk_root: default_chunk_root(),
            final_root: default_final_root(),
            remove_chunks_after_merge: false,
            strict_size_check: false,
            max_chunk_bytes: default_max_chunk_bytes(),
        }
    }
}

/// REST API server configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address the API server binds to (default: 127.0.0.1:8090)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Whether CORS headers are emitted (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins; "*" or an empty list allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Serve interactive Swagger UI documentation at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,

    /// Expose merged artifacts read-only under /files/* (default: true)
    #[serde(default = "default_true")]
    pub serve_files: bool,

    /// Capacity of the broadcast event channel (default: 256)
    #[serde(default = "default_event_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: Vec::new(),
            swagger_ui: true,
            serve_files: true,
            event_channel_capacity: default_event_capacity(),
        }
    }
}

/// Main configuration for [`UploadAssembler`](crate::UploadAssembler)
///
/// Storage fields are flattened for a flat JSON/TOML format; the API server
/// settings live under the `api` key.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Storage behavior settings (roots, cleanup, size policy)
    #[serde(flatten)]
    pub storage: StorageConfig,

    /// API server settings
    #[serde(default)]
    pub api: ApiConfig,
}

// Convenience accessors, delegating to the sub-config structs.
impl Config {
    /// Chunk storage root
    pub fn chunk_root(&self) -> &PathBuf {
        &self.storage.chunk_root
    }

    /// Final artifact storage root
    pub fn final_root(&self) -> &PathBuf {
        &self.storage.final_root
    }

    /// Validate the configuration, returning a [`Config`](crate::Error::Config)
    /// error naming the offending key on failure.
    pub fn validate(&self) -> crate::Result<()> {
        if self.storage.chunk_root == self.storage.final_root {
            return Err(crate::Error::Config {
                message: "chunk_root and final_root must be distinct directories".to_string(),
                key: Some("final_root".to_string()),
            });
        }
        if self.storage.max_chunk_bytes == 0 {
            return Err(crate::Error::Config {
                message: "max_chunk_bytes must be greater than zero".to_string(),
                key: Some("max_chunk_bytes".to_string()),
            });
        }
        if self.api.event_channel_capacity == 0 {
            return Err(crate::Error::Config {
                message: "event_channel_capacity must be greater than zero".to_string(),
                key: Some("api.event_channel_capacity".to_string()),
            });
        }
        Ok(())
    }
}

fn default_chunk_root() -> PathBuf {
    PathBuf::from("./data/chunks")
}

fn default_final_root() -> PathBuf {
    PathBuf::from("./data/uploads")
}

fn default_max_chunk_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_bind_address() -> SocketAddr {
    #[allow(clippy::unwrap_used)]
    "127.0.0.1:8090".parse().unwrap()
}

fn default_event_capacity() -> usize {
    256
}

fn default_true() -> bool {
    true
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_root(), &PathBuf::from("./data/chunks"));
        assert_eq!(config.final_root(), &PathBuf::from("./data/uploads"));
        assert!(!config.storage.remove_chunks_after_merge);
        assert!(!config.storage.strict_size_check);
    }

    #[test]
    fn identical_roots_are_rejected() {
        let config = Config {
            storage: StorageConfig {
                chunk_root: PathBuf::from("./data/same"),
                final_root: PathBuf::from("./data/same"),
                ..Default::default()
            },
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        match err {
            crate::Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("final_root")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn zero_chunk_limit_is_rejected() {
        let config = Config {
            storage: StorageConfig {
                max_chunk_bytes: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_json_deserializes_to_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.storage.max_chunk_bytes, 16 * 1024 * 1024);
        assert!(config.api.cors_enabled);
        assert_eq!(config.api.bind_address.port(), 8090);
    }

    #[test]
    fn storage_fields_are_flattened_in_json() {
        let json = r#"{"chunk_root": "/srv/chunks", "final_root": "/srv/uploads"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.chunk_root(), &PathBuf::from("/srv/chunks"));
        assert_eq!(config.final_root(), &PathBuf::from("/srv/uploads"));
    }
}
