//! Error types for chunk-assembler
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error variants for chunk placement and merging
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for chunk-assembler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for chunk-assembler
///
/// Every failure is scoped to the offending transfer and returned as a
/// structured result; nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum Error {
    /// A required request field was absent
    #[error("missing parameter: {name}")]
    MissingParameter {
        /// Name of the absent field (e.g. "identifier", "chunkNumber")
        name: String,
    },

    /// A client-supplied path would escape the configured storage root
    #[error("path escapes storage root: {path}")]
    PathTraversal {
        /// The offending path, as received from the client
        path: String,
    },

    /// Chunk number outside the valid `[1, totalChunks]` range
    #[error("chunk number {number} out of range 1..={total}")]
    ChunkOutOfRange {
        /// The rejected chunk number
        number: u32,
        /// The transfer's declared total chunk count
        total: u32,
    },

    /// Filesystem operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Merge attempted while one or more chunks are absent from storage
    #[error("transfer incomplete: missing chunks {missing:?}")]
    IncompleteTransfer {
        /// Sorted list of missing chunk numbers; resubmit these to recover
        missing: Vec<u32>,
    },

    /// Assembled byte count disagrees with the reported total size
    ///
    /// Only returned when `strict_size_check` is enabled; otherwise the
    /// mismatch is logged as a warning and the merge succeeds.
    #[error("size mismatch: expected {expected} bytes, assembled {actual} bytes")]
    SizeMismatch {
        /// Total size reported by the client during upload
        expected: u64,
        /// Byte count actually assembled from the stored chunks
        actual: u64,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "chunk_root")
        key: Option<String>,
    },

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// API error response format
///
/// Returned by API endpoints when an error occurs: a machine-readable code,
/// a human-readable message, and optional contextual details.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "incomplete_transfer",
///     "message": "transfer incomplete: missing chunks [2, 5]",
///     "details": {
///       "missing_chunks": [2, 5]
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "missing_parameter")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client input incomplete or rejected outright
            Error::MissingParameter { .. } => 400,
            Error::PathTraversal { .. } => 400,
            Error::Config { .. } => 400,

            // 409 Conflict - Transfer exists but is not in a mergeable state
            Error::IncompleteTransfer { .. } => 409,

            // 422 Unprocessable Entity - Semantic errors
            Error::ChunkOutOfRange { .. } => 422,
            Error::SizeMismatch { .. } => 422,

            // 500 Internal Server Error
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::MissingParameter { .. } => "missing_parameter",
            Error::PathTraversal { .. } => "path_traversal",
            Error::ChunkOutOfRange { .. } => "chunk_out_of_range",
            Error::Io(_) => "io_error",
            Error::IncompleteTransfer { .. } => "incomplete_transfer",
            Error::SizeMismatch { .. } => "size_mismatch",
            Error::Config { .. } => "config_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        // Attach contextual details for the variants a client can act on
        let details = match &error {
            Error::MissingParameter { name } => Some(serde_json::json!({
                "parameter": name,
            })),
            Error::PathTraversal { path } => Some(serde_json::json!({
                "path": path,
            })),
            Error::ChunkOutOfRange { number, total } => Some(serde_json::json!({
                "chunk_number": number,
                "total_chunks": total,
            })),
            Error::IncompleteTransfer { missing } => Some(serde_json::json!({
                "missing_chunks": missing,
            })),
            Error::SizeMismatch { expected, actual } => Some(serde_json::json!({
                "expected_bytes": expected,
                "actual_bytes": actual,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    /// Returns (Error, expected_status_code, expected_error_code) for every
    /// reachable match arm in ToHttpStatus.
    fn all_error_variants() -> Vec<(Error, u16, &'static str)> {
        vec![
            (
                Error::MissingParameter {
                    name: "identifier".into(),
                },
                400,
                "missing_parameter",
            ),
            (
                Error::PathTraversal {
                    path: "../../etc/passwd".into(),
                },
                400,
                "path_traversal",
            ),
            (
                Error::ChunkOutOfRange {
                    number: 9,
                    total: 4,
                },
                422,
                "chunk_out_of_range",
            ),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                500,
                "io_error",
            ),
            (
                Error::IncompleteTransfer {
                    missing: vec![2, 5],
                },
                409,
                "incomplete_transfer",
            ),
            (
                Error::SizeMismatch {
                    expected: 1024,
                    actual: 1000,
                },
                422,
                "size_mismatch",
            ),
            (
                Error::Config {
                    message: "bad value".into(),
                    key: Some("chunk_root".into()),
                },
                400,
                "config_error",
            ),
            (
                Error::ApiServerError("bind failed".into()),
                500,
                "api_server_error",
            ),
        ]
    }

    #[test]
    fn every_variant_maps_to_expected_status_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            let actual_status = error.status_code();
            assert_eq!(
                actual_status, expected_status,
                "Error variant with error_code={expected_code} returned status {actual_status}, expected {expected_status}"
            );
        }
    }

    #[test]
    fn every_variant_maps_to_expected_error_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            let actual_code = error.error_code();
            assert_eq!(
                actual_code, expected_code,
                "Error variant with expected status={expected_status} returned error_code={actual_code}"
            );
        }
    }

    #[test]
    fn incomplete_transfer_is_409_conflict() {
        let err = Error::IncompleteTransfer { missing: vec![1] };
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn path_traversal_is_400_not_500() {
        let err = Error::PathTraversal {
            path: "/etc/shadow".into(),
        };
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn api_error_from_incomplete_transfer_lists_missing_chunks() {
        let err = Error::IncompleteTransfer {
            missing: vec![2, 3, 7],
        };
        let api: ApiError = err.into();

        assert_eq!(api.error.code, "incomplete_transfer");
        let details = api.error.details.expect("should have details");
        assert_eq!(details["missing_chunks"], serde_json::json!([2, 3, 7]));
    }

    #[test]
    fn api_error_from_missing_parameter_names_the_field() {
        let err = Error::MissingParameter {
            name: "chunkNumber".into(),
        };
        let api: ApiError = err.into();

        assert_eq!(api.error.code, "missing_parameter");
        let details = api.error.details.expect("should have details");
        assert_eq!(details["parameter"], "chunkNumber");
    }

    #[test]
    fn api_error_from_size_mismatch_has_byte_counts() {
        let err = Error::SizeMismatch {
            expected: 18,
            actual: 15,
        };
        let api: ApiError = err.into();

        assert_eq!(api.error.code, "size_mismatch");
        let details = api.error.details.expect("should have details");
        assert_eq!(details["expected_bytes"], 18);
        assert_eq!(details["actual_bytes"], 15);
    }

    #[test]
    fn api_error_from_io_has_no_details() {
        let err = Error::Io(std::io::Error::other("disk fail"));
        let api: ApiError = err.into();

        assert_eq!(api.error.code, "io_error");
        assert!(api.error.details.is_none());
    }

    #[test]
    fn api_error_message_matches_error_display() {
        let err = Error::IncompleteTransfer {
            missing: vec![4, 6],
        };
        let display_msg = err.to_string();
        let api: ApiError = err.into();

        assert_eq!(api.error.message, display_msg);
        assert!(api.error.message.contains("[4, 6]"));
    }

    #[test]
    fn api_error_without_details_omits_details_in_json() {
        let api = ApiError::new("test_code", "test message");

        let json_str = serde_json::to_string(&api).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json_str).unwrap();

        assert_eq!(parsed["error"]["code"], "test_code");
        assert!(
            parsed["error"].get("details").is_none(),
            "details field should be omitted from JSON when None"
        );
    }

    #[test]
    fn api_error_round_trips_through_json() {
        let original = ApiError::with_details(
            "incomplete_transfer",
            "transfer incomplete",
            serde_json::json!({"missing_chunks": [1]}),
        );

        let json_str = serde_json::to_string(&original).unwrap();
        let deserialized: ApiError = serde_json::from_str(&json_str).unwrap();

        assert_eq!(deserialized.error.code, original.error.code);
        assert_eq!(deserialized.error.details, original.error.details);
    }
}
