//! Route tests driven through the router with `oneshot`.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use greenproof_server::transport::{router, router_with_body_limit};

use common::*;

const BOUNDARY: &str = "greenproof-test-boundary";

// ─────────────────────── helpers ───────────────────────

enum Part<'a> {
    File(&'a str, &'a [u8]),
    Text(&'a str, &'a str),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File(name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{name}.jpg\"\r\n\
                         Content-Type: image/jpeg\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}").as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn analyze_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/audit/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, req).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ─────────────────────── tests ───────────────────────

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(without_maps(dir.path()));

    let (status, body) = send_json(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_analyze_then_download_report() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(without_maps(dir.path()));
    let previous = plot_jpeg(16);
    let current = plot_jpeg(40);

    let (status, body) = send_json(
        &app,
        analyze_request(&[
            Part::File("previous_image", &previous),
            Part::File("current_image", &current),
            Part::Text("project_id", "plot-42"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let audit_id = body["auditId"].as_str().unwrap();
    assert!(body["trustScore"].as_f64().unwrap() >= 0.0);
    assert!(body["credits"].as_f64().unwrap() >= 0.0);
    assert!(body["growthPercentage"].as_f64().unwrap() > 0.0);
    assert!(body["diseasePercentage"].is_number());
    assert!(body["location"].is_null());
    assert!(body["satellitePath"].is_null());
    assert_eq!(body["timestamp"], "Unknown");

    let report_path = body["reportPath"].as_str().unwrap();
    let file_name = format!("{audit_id}_report.pdf");
    assert!(report_path.ends_with(&file_name));

    let resp = app
        .clone()
        .oneshot(get(&format!("/api/audit/report/{file_name}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
    let pdf = resp.into_body().collect().await.unwrap().to_bytes();
    assert!(pdf.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_missing_field_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(without_maps(dir.path()));
    let previous = plot_jpeg(16);

    let (status, body) = send_json(
        &app,
        analyze_request(&[
            Part::File("previous_image", &previous),
            Part::Text("project_id", "plot-42"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("current_image"));
    assert!(listing(dir.path()).is_empty());
}

#[tokio::test]
async fn test_undecodable_upload_is_unprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(without_maps(dir.path()));
    let previous = plot_jpeg(16);

    let (status, body) = send_json(
        &app,
        analyze_request(&[
            Part::File("previous_image", &previous),
            Part::File("current_image", b"GIF89a but not really"),
            Part::Text("project_id", "plot-42"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("current"));
    assert!(listing(dir.path()).is_empty());
}

#[tokio::test]
async fn test_oversized_upload_is_payload_too_large() {
    let dir = tempfile::tempdir().unwrap();
    let app = router_with_body_limit(without_maps(dir.path()), 4 * 1024);
    let previous = vec![0xAB; 16 * 1024];
    let current = plot_jpeg(16);

    let (status, body) = send_json(
        &app,
        analyze_request(&[
            Part::File("previous_image", &previous),
            Part::File("current_image", &current),
            Part::Text("project_id", "plot-42"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE, "{body}");
    assert!(body["error"].is_string());
    assert!(listing(dir.path()).is_empty());
}

#[tokio::test]
async fn test_report_lookup_stays_in_artifact_dir() {
    let root = tempfile::tempdir().unwrap();
    let artifacts = root.path().join("artifacts");
    std::fs::write(root.path().join("secret_report.pdf"), b"%PDF secret").unwrap();
    let app = router(without_maps(&artifacts));

    for uri in [
        "/api/audit/report/missing_report.pdf",
        "/api/audit/report/..%2Fsecret_report.pdf",
        "/api/audit/report/%2E%2E%2Fsecret_report.pdf",
        "/api/audit/report/notes.txt",
    ] {
        let (status, body) = send_json(&app, get(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert!(body["error"].is_string());
    }
}
