use super::*;
use crate::config::StorageConfig;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tempfile::tempdir;
use tower::ServiceExt;

const BOUNDARY: &str = "X-CHUNK-ASSEMBLER-TEST";

/// Helper to create a test assembler and router over temp storage roots
async fn test_app() -> (Router, Arc<UploadAssembler>, tempfile::TempDir) {
    let temp = tempdir().unwrap();
    let config = Config {
        storage: StorageConfig {
            chunk_root: temp.path().join("chunks"),
            final_root: temp.path().join("final"),
            ..Default::default()
        },
        ..Default::default()
    };
    let assembler = Arc::new(UploadAssembler::new(config).await.unwrap());
    let app = create_router(assembler.clone(), assembler.config.clone());
    (app, assembler, temp)
}

/// Build a multipart/form-data body with the given text fields and an
/// optional binary `file` field
fn multipart_body(fields: &[(&str, String)], file: Option<&[u8]>) -> Body {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(bytes) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"blob\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
}

fn chunk_fields(
    identifier: &str,
    relative_path: &str,
    filename: &str,
    chunk_number: u32,
    total_chunks: u32,
    payload: &[u8],
    total_size: u64,
) -> Vec<(&'static str, String)> {
    vec![
        ("identifier", identifier.to_string()),
        ("relativePath", relative_path.to_string()),
        ("filename", filename.to_string()),
        ("chunkNumber", chunk_number.to_string()),
        ("totalChunks", total_chunks.to_string()),
        ("chunkSize", "5".to_string()),
        ("currentChunkSize", payload.len().to_string()),
        ("totalSize", total_size.to_string()),
    ]
}

fn chunk_request(body: Body) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/uploads/chunks")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(body)
        .unwrap()
}

fn merge_request_body(json: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/uploads/merge")
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (app, _assembler, _temp) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn chunk_upload_reports_need_merge_on_completion() {
    let (app, _assembler, _temp) = test_app().await;

    let first = app
        .clone()
        .oneshot(chunk_request(multipart_body(
            &chunk_fields("s1", "docs/a.txt", "a.txt", 2, 2, b"BBB", 8),
            Some(b"BBB"),
        )))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first = json_body(first).await;
    assert_eq!(first["chunkNumber"], 2);
    assert_eq!(first["needMerge"], false);

    let second = app
        .oneshot(chunk_request(multipart_body(
            &chunk_fields("s1", "docs/a.txt", "a.txt", 1, 2, b"AAAAA", 8),
            Some(b"AAAAA"),
        )))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let second = json_body(second).await;
    assert_eq!(second["needMerge"], true);
}

#[tokio::test]
async fn each_missing_field_is_rejected() {
    let (app, _assembler, temp) = test_app().await;

    for absent in [
        "identifier",
        "relativePath",
        "filename",
        "chunkNumber",
        "totalChunks",
        "chunkSize",
        "currentChunkSize",
        "totalSize",
    ] {
        let mut fields = chunk_fields("s1", "docs/a.txt", "a.txt", 1, 2, b"AAAAA", 8);
        fields.retain(|(name, _)| *name != absent);

        let response = app
            .clone()
            .oneshot(chunk_request(multipart_body(&fields, Some(b"AAAAA"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "field {absent}");
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "missing_parameter");
        assert_eq!(body["error"]["details"]["parameter"], absent);
    }

    // Rejected before any storage I/O
    let chunks: Vec<_> = std::fs::read_dir(temp.path().join("chunks"))
        .unwrap()
        .collect();
    assert!(chunks.is_empty());
}

#[tokio::test]
async fn missing_file_field_is_rejected() {
    let (app, _assembler, _temp) = test_app().await;

    let response = app
        .oneshot(chunk_request(multipart_body(
            &chunk_fields("s1", "docs/a.txt", "a.txt", 1, 2, b"AAAAA", 8),
            None,
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["details"]["parameter"], "file");
}

#[tokio::test]
async fn non_numeric_chunk_number_is_rejected() {
    let (app, _assembler, _temp) = test_app().await;

    let mut fields = chunk_fields("s1", "docs/a.txt", "a.txt", 1, 2, b"AAAAA", 8);
    for (name, value) in &mut fields {
        if *name == "chunkNumber" {
            *value = "three".to_string();
        }
    }

    let response = app
        .oneshot(chunk_request(multipart_body(&fields, Some(b"AAAAA"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn chunk_number_above_total_is_unprocessable() {
    let (app, _assembler, _temp) = test_app().await;

    let response = app
        .oneshot(chunk_request(multipart_body(
            &chunk_fields("s1", "docs/a.txt", "a.txt", 7, 2, b"AAAAA", 8),
            Some(b"AAAAA"),
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "chunk_out_of_range");
}

#[tokio::test]
async fn traversal_relative_path_is_rejected_without_mutation() {
    let (app, _assembler, temp) = test_app().await;

    let response = app
        .oneshot(chunk_request(multipart_body(
            &chunk_fields("s1", "../../etc/passwd", "passwd", 1, 1, b"evil", 4),
            Some(b"evil"),
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "path_traversal");

    let chunks: Vec<_> = std::fs::read_dir(temp.path().join("chunks"))
        .unwrap()
        .collect();
    assert!(chunks.is_empty(), "no chunk directory may be created");
    assert!(!temp.path().join("etc").exists());
}

#[tokio::test]
async fn merge_with_missing_field_is_rejected() {
    let (app, _assembler, _temp) = test_app().await;

    let response = app
        .oneshot(merge_request_body(serde_json::json!({
            "identifier": "s1",
            "relativePath": "docs/a.txt",
            // filename absent
            "totalChunks": 2,
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["details"]["parameter"], "filename");
}

#[tokio::test]
async fn merge_before_all_chunks_is_conflict() {
    let (app, _assembler, _temp) = test_app().await;

    let upload = app
        .clone()
        .oneshot(chunk_request(multipart_body(
            &chunk_fields("s1", "docs/a.txt", "a.txt", 1, 3, b"AAAAA", 13),
            Some(b"AAAAA"),
        )))
        .await
        .unwrap();
    assert_eq!(upload.status(), StatusCode::OK);

    let response = app
        .oneshot(merge_request_body(serde_json::json!({
            "identifier": "s1",
            "relativePath": "docs/a.txt",
            "filename": "a.txt",
            "totalChunks": 3,
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "incomplete_transfer");
    assert_eq!(
        body["error"]["details"]["missing_chunks"],
        serde_json::json!([2, 3])
    );
}

#[tokio::test]
async fn full_upload_and_merge_flow_serves_the_artifact() {
    let (app, _assembler, _temp) = test_app().await;

    // Out-of-order upload of "AAAAABBB"
    for (number, payload) in [(2u32, b"BBB" as &[u8]), (1, b"AAAAA")] {
        let response = app
            .clone()
            .oneshot(chunk_request(multipart_body(
                &chunk_fields("s1", "docs/a.txt", "a.txt", number, 2, payload, 8),
                Some(payload),
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(merge_request_body(serde_json::json!({
            "identifier": "s1",
            "relativePath": "docs/a.txt",
            "filename": "a.txt",
            "totalChunks": 2,
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["relativePath"], "docs/a.txt");
    assert_eq!(body["sizeBytes"], 8);
    assert_eq!(body["url"], "/files/docs/a.txt");

    // The artifact is retrievable through the static file surface
    let served = app
        .oneshot(
            Request::builder()
                .uri("/files/docs/a.txt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(served.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(served.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"AAAAABBB");
}

#[tokio::test]
async fn cors_headers_are_emitted_when_enabled() {
    let (app, _assembler, _temp) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("Origin", "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn openapi_spec_is_served() {
    let (app, _assembler, _temp) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body.get("openapi").is_some());
    assert!(body["paths"].get("/uploads/chunks").is_some());
}
