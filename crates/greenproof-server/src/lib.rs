//! GreenProof service: audit orchestration, satellite cross-checks, PDF
//! reports, and the HTTP API.

pub mod config;
pub mod pipeline;
pub mod render;
pub mod satellite;
pub mod transport;
pub mod types;

use std::sync::Arc;

pub use config::ServiceConfig;
pub use pipeline::{AuditOrchestrator, AuditOutcome};
pub use render::PdfReportRenderer;
pub use transport::HttpTransport;

use greenproof::scoring::SUBSCORE_WEIGHT;
use pipeline::ArtifactStore;
use satellite::{CrossValidator, StaticMapClient};

/// Wire the production orchestrator from resolved configuration.
///
/// Creates the artifact directory. Without a maps key the cross-validator is
/// disabled and a warning is logged.
pub fn build_orchestrator(config: &ServiceConfig) -> std::io::Result<AuditOrchestrator> {
    let store = ArtifactStore::open(&config.artifact_dir)?;

    let validator = match &config.maps_api_key {
        Some(key) => {
            let client = StaticMapClient::new(config.maps_base_url.clone(), key.clone());
            CrossValidator::new(Arc::new(client), config.retry)
        }
        None => {
            tracing::warn!(
                "{} not set; satellite cross-validation disabled",
                config::MAPS_API_KEY_ENV
            );
            CrossValidator::disabled()
        }
    };

    Ok(AuditOrchestrator::new(
        store,
        validator,
        Arc::new(PdfReportRenderer),
        config.scoring,
    ))
}

/// Version, build features, and resolved settings as printed by `info`.
pub fn service_info(config: &ServiceConfig) -> serde_json::Value {
    serde_json::json!({
        "name": "greenproof",
        "version": env!("CARGO_PKG_VERSION"),
        "heic": greenproof::HEIC_SUPPORTED,
        "artifact_dir": config.artifact_dir.display().to_string(),
        "cross_validation": config.cross_validation_enabled(),
        "maps_base_url": config.maps_base_url,
        "max_upload_bytes": config::MAX_UPLOAD_BYTES,
        "scoring": {
            "subscore_weight": SUBSCORE_WEIGHT,
            "area_hectares": config.scoring.area_hectares,
            "sequestration_rate": config.scoring.sequestration_rate,
            "fidelity_curve": config.scoring.fidelity_curve,
        },
        "retry": {
            "max_attempts": config.retry.max_attempts,
            "attempt_timeout_ms": config.retry.attempt_timeout.as_millis() as u64,
            "backoff_ms": config.retry.backoff.as_millis() as u64,
        },
    })
}
