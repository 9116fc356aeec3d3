//! HTTP transport: analyze uploads, report downloads, and /health.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json as AxumJson, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use greenproof::AuditRequest;

use crate::config::MAX_UPLOAD_BYTES;
use crate::pipeline::AuditOrchestrator;
use crate::types::{AnalyzeResponse, HealthResponse, ServiceError, ServiceResult};

/// Multipart field names of the analyze form.
pub const PREVIOUS_IMAGE_FIELD: &str = "previous_image";
pub const CURRENT_IMAGE_FIELD: &str = "current_image";
pub const PROJECT_ID_FIELD: &str = "project_id";

/// Shared server state passed to all handlers via axum State.
pub struct ServerState {
    pub orchestrator: Arc<AuditOrchestrator>,
}

/// Build the service router.
pub fn router(orchestrator: Arc<AuditOrchestrator>) -> Router {
    router_with_body_limit(orchestrator, MAX_UPLOAD_BYTES)
}

/// Build the service router with a custom request body limit in bytes.
pub fn router_with_body_limit(orchestrator: Arc<AuditOrchestrator>, limit: usize) -> Router {
    let state = Arc::new(ServerState { orchestrator });

    Router::new()
        .route("/api/audit/analyze", post(handle_analyze))
        .route("/api/audit/report/:filename", get(handle_report))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// HTTP server for the audit API.
pub struct HttpTransport {
    orchestrator: Arc<AuditOrchestrator>,
}

impl HttpTransport {
    pub fn new(orchestrator: Arc<AuditOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Run the HTTP server on the given address.
    pub async fn run(&self, addr: &str) -> ServiceResult<()> {
        let app = router(Arc::clone(&self.orchestrator));

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("HTTP transport listening on {addr}");

        axum::serve(listener, app).await?;
        Ok(())
    }
}

async fn handle_analyze(
    State(state): State<Arc<ServerState>>,
    mut multipart: Multipart,
) -> ServiceResult<AxumJson<AnalyzeResponse>> {
    let mut previous = None;
    let mut current = None;
    let mut project_id = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("malformed multipart body", e))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            PREVIOUS_IMAGE_FIELD => previous = Some(read_bytes(field).await?),
            CURRENT_IMAGE_FIELD => current = Some(read_bytes(field).await?),
            PROJECT_ID_FIELD => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(&format!("unreadable {name}"), e))?;
                project_id = Some(text.trim().to_string()).filter(|p| !p.is_empty());
            }
            other => tracing::debug!("Ignoring multipart field {other:?}"),
        }
    }

    let request = AuditRequest {
        baseline: previous.ok_or_else(|| missing(PREVIOUS_IMAGE_FIELD))?,
        current: current.ok_or_else(|| missing(CURRENT_IMAGE_FIELD))?,
        project_id: project_id.ok_or_else(|| missing(PROJECT_ID_FIELD))?,
    };

    let outcome = state.orchestrator.run(request).await?;
    Ok(AxumJson(outcome.response))
}

async fn read_bytes(field: axum::extract::multipart::Field<'_>) -> ServiceResult<Vec<u8>> {
    let name = field.name().unwrap_or("").to_string();
    field
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| multipart_error(&format!("unreadable {name}"), e))
}

/// Keep axum's own status for multipart failures: an exceeded body limit is
/// 413, anything else is a bad request.
fn multipart_error(context: &str, e: MultipartError) -> ServiceError {
    let message = format!("{context}: {}", e.body_text());
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::PayloadTooLarge(message)
    } else {
        ServiceError::InvalidRequest(message)
    }
}

fn missing(field: &str) -> ServiceError {
    ServiceError::InvalidRequest(format!("missing field {field}"))
}

async fn handle_report(
    State(state): State<Arc<ServerState>>,
    Path(filename): Path<String>,
) -> ServiceResult<Response> {
    let path = state
        .orchestrator
        .store()
        .locate_report(&filename)
        .ok_or_else(|| ServiceError::NotFound("Report not found".to_string()))?;

    let bytes = tokio::fs::read(&path).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Health check endpoint.
async fn handle_health() -> AxumJson<HealthResponse> {
    AxumJson(HealthResponse::default())
}
