//! Upload handlers: chunk ingest and merge

use crate::api::AppState;
use crate::error::{ApiError, Error};
use crate::types::{ChunkUpload, MergeRequest};
use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::collections::HashMap;

/// POST /uploads/chunks - Accept one chunk of a transfer
///
/// Expects multipart/form-data with text fields `identifier`,
/// `relativePath`, `filename`, `chunkNumber`, `totalChunks`, `chunkSize`,
/// `currentChunkSize`, `totalSize` and the chunk payload in a `file` field.
#[utoipa::path(
    post,
    path = "/uploads/chunks",
    tag = "uploads",
    request_body(content = Vec<u8>, description = "Chunk upload (multipart/form-data)", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Chunk accepted; needMerge reports whether the transfer is complete"),
        (status = 400, description = "Missing or invalid parameter, or rejected path"),
        (status = 422, description = "Chunk number out of range"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn upload_chunk(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut payload: Option<Vec<u8>> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            match field.bytes().await {
                Ok(bytes) => payload = Some(bytes.to_vec()),
                Err(e) => {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(ApiError::new(
                            "invalid_file",
                            format!("Failed to read chunk payload: {e}"),
                        )),
                    )
                        .into_response();
                }
            }
        } else if let Ok(value) = field.text().await {
            fields.insert(name, value);
        }
    }

    // Reject before any storage I/O
    let upload = match chunk_upload_from_fields(&fields) {
        Ok(upload) => upload,
        Err(response) => return response,
    };
    let Some(payload) = payload else {
        return Error::MissingParameter {
            name: "file".into(),
        }
        .into_response();
    };

    match state.assembler.handle_chunk(&upload, &payload).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(json!({
                "chunkNumber": receipt.chunk_number,
                "needMerge": receipt.need_merge,
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /uploads/merge - Merge a completed transfer into its final artifact
#[utoipa::path(
    post,
    path = "/uploads/merge",
    tag = "uploads",
    request_body = MergeRequest,
    responses(
        (status = 200, description = "Transfer merged; response carries the artifact's relative path, size, and URL", body = crate::types::FinalArtifact),
        (status = 400, description = "Missing parameter or rejected path"),
        (status = 409, description = "Transfer incomplete; details list the missing chunk numbers"),
        (status = 422, description = "Assembled size disagrees with the reported total (strict mode)"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn merge_transfer(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    let request = match merge_request_from_json(&payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match state.assembler.merge(&request).await {
        Ok(artifact) => (
            StatusCode::OK,
            Json(json!({
                "relativePath": artifact.relative_path,
                "sizeBytes": artifact.size_bytes,
                "url": artifact.url,
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

fn chunk_upload_from_fields(fields: &HashMap<String, String>) -> Result<ChunkUpload, Response> {
    Ok(ChunkUpload {
        identifier: text_field(fields, "identifier")?,
        relative_path: text_field(fields, "relativePath")?,
        filename: text_field(fields, "filename")?,
        chunk_number: u32_field(fields, "chunkNumber")?,
        total_chunks: u32_field(fields, "totalChunks")?,
        chunk_size: u64_field(fields, "chunkSize")?,
        current_chunk_size: u64_field(fields, "currentChunkSize")?,
        total_size: u64_field(fields, "totalSize")?,
    })
}

fn merge_request_from_json(payload: &serde_json::Value) -> Result<MergeRequest, Response> {
    let text = |name: &str| -> Result<String, Response> {
        match payload.get(name).and_then(|value| value.as_str()) {
            Some(value) if !value.trim().is_empty() => Ok(value.to_string()),
            _ => Err(missing(name)),
        }
    };

    let total_chunks = payload
        .get("totalChunks")
        .and_then(|value| value.as_u64())
        .ok_or_else(|| missing("totalChunks"))?;
    let total_chunks = u32::try_from(total_chunks).map_err(|_| invalid_integer("totalChunks"))?;

    Ok(MergeRequest {
        identifier: text("identifier")?,
        relative_path: text("relativePath")?,
        filename: text("filename")?,
        total_chunks,
    })
}

fn text_field(fields: &HashMap<String, String>, name: &str) -> Result<String, Response> {
    match fields.get(name) {
        Some(value) if !value.trim().is_empty() => Ok(value.clone()),
        _ => Err(missing(name)),
    }
}

fn u32_field(fields: &HashMap<String, String>, name: &str) -> Result<u32, Response> {
    text_field(fields, name)?
        .parse::<u32>()
        .map_err(|_| invalid_integer(name))
}

fn u64_field(fields: &HashMap<String, String>, name: &str) -> Result<u64, Response> {
    text_field(fields, name)?
        .parse::<u64>()
        .map_err(|_| invalid_integer(name))
}

fn missing(name: &str) -> Response {
    Error::MissingParameter { name: name.into() }.into_response()
}

fn invalid_integer(name: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError::validation(format!(
            "field {name} must be a non-negative integer"
        ))),
    )
        .into_response()
}
