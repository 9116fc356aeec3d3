//! JSON bodies returned by the HTTP surface and the `audit` command.

use std::path::Path;

use serde::{Deserialize, Serialize};

use greenproof::{AuditReport, GeoLocation};

/// Coordinates in the analyze response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationBody {
    pub lat: f64,
    pub lon: f64,
}

/// Result of `POST /api/audit/analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub audit_id: String,
    pub trust_score: f64,
    pub credits: f64,
    pub growth_percentage: f64,
    pub disease_percentage: f64,
    /// `null` when the photo carried no usable geotag.
    pub location: Option<LocationBody>,
    pub timestamp: String,
    pub report_path: String,
    pub heatmap_path: String,
    pub ela_path: String,
    pub satellite_path: Option<String>,
}

impl AnalyzeResponse {
    pub fn from_report(report: &AuditReport, report_path: &Path) -> Self {
        let location = match report.location {
            GeoLocation::Valid { lat, lon } => Some(LocationBody { lat, lon }),
            GeoLocation::Invalid => None,
        };
        let artifacts = &report.artifacts;
        Self {
            audit_id: report.audit_id.clone(),
            trust_score: report.trust.aggregate,
            credits: report.credits.t_co2,
            growth_percentage: report.metrics.growth_pct,
            disease_percentage: report.metrics.disease_pct,
            location,
            timestamp: report.capture_timestamp.clone(),
            report_path: report_path.display().to_string(),
            heatmap_path: artifacts.heatmap.display().to_string(),
            ela_path: artifacts.forgery_residual.display().to_string(),
            satellite_path: artifacts.satellite.as_ref().map(|p| p.display().to_string()),
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
