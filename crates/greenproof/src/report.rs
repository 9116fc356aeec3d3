//! Renderer-agnostic audit report model.
//!
//! The synthesizer only arranges values and artifact references. Turning the
//! model into bytes is the job of a [`ReportRenderer`].

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    AnalysisMetrics, AuditError, AuditResult, CaptureMetadata, CreditEstimate, CrossCheck,
    GeoLocation, TrustScoreBreakdown,
};

/// Report title shown on the summary page.
pub const REPORT_TITLE: &str = "Carbon Audit Report";

/// Title of the evidence page.
pub const EVIDENCE_TITLE: &str = "Verification Evidence";

/// What an evidence artifact depicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    BaselineImage,
    CurrentImage,
    GrowthHeatmap,
    ForgeryResidual,
    SatelliteTile,
}

impl ArtifactKind {
    pub fn caption(self) -> &'static str {
        match self {
            ArtifactKind::BaselineImage => "Baseline Image",
            ArtifactKind::CurrentImage => "Current Image (Verified)",
            ArtifactKind::GrowthHeatmap => "AI Growth Heatmap",
            ArtifactKind::ForgeryResidual => "Error Level Analysis",
            ArtifactKind::SatelliteTile => "Satellite Cross-Reference",
        }
    }

    /// Slot on the evidence grid, if the artifact is placed there at all.
    pub fn grid_slot(self) -> Option<GridSlot> {
        match self {
            ArtifactKind::BaselineImage => Some(GridSlot::TopLeft),
            ArtifactKind::CurrentImage => Some(GridSlot::TopRight),
            ArtifactKind::GrowthHeatmap => Some(GridSlot::BottomLeft),
            ArtifactKind::SatelliteTile => Some(GridSlot::BottomRight),
            ArtifactKind::ForgeryResidual => None,
        }
    }
}

/// Quadrant of the four-image evidence grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridSlot {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Where a renderer should place an evidence image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// 1-based page number.
    pub page: u8,
    pub slot: GridSlot,
}

/// Page holding the evidence grid.
pub const EVIDENCE_PAGE: u8 = 2;

/// One captioned image on the evidence page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub kind: ArtifactKind,
    pub caption: String,
    pub path: PathBuf,
    pub placement: Placement,
}

/// Files persisted for one audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportArtifacts {
    pub baseline: PathBuf,
    pub current: PathBuf,
    pub heatmap: PathBuf,
    pub forgery_residual: PathBuf,
    pub satellite: Option<PathBuf>,
}

/// Everything the synthesizer needs, gathered by the orchestrator.
#[derive(Debug, Clone)]
pub struct ReportInputs {
    pub audit_id: String,
    pub project_id: String,
    pub generated_at: DateTime<Utc>,
    pub metadata: CaptureMetadata,
    pub metrics: AnalysisMetrics,
    pub cross_check: CrossCheck,
    pub trust: TrustScoreBreakdown,
    pub credits: CreditEstimate,
    pub artifacts: ReportArtifacts,
}

/// The complete, immutable result of one audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub audit_id: String,
    pub project_id: String,
    pub generated_at: DateTime<Utc>,
    pub capture_timestamp: String,
    pub location: GeoLocation,
    pub metrics: AnalysisMetrics,
    pub cross_check: CrossCheck,
    pub trust: TrustScoreBreakdown,
    pub credits: CreditEstimate,
    /// Shown as a badge on the summary page.
    pub satellite_verified: bool,
    pub artifacts: ReportArtifacts,
    /// Evidence grid, in placement order.
    pub evidence: Vec<EvidenceItem>,
}

/// Assemble the report model from resolved pipeline outputs.
pub fn synthesize_report(inputs: ReportInputs) -> AuditReport {
    let ReportInputs {
        audit_id,
        project_id,
        generated_at,
        metadata,
        metrics,
        cross_check,
        trust,
        credits,
        artifacts,
    } = inputs;

    // A check can only have run against a valid location.
    let cross_check = if metadata.location.is_valid() {
        cross_check
    } else {
        CrossCheck::not_attempted()
    };

    let mut sources = vec![
        (ArtifactKind::BaselineImage, artifacts.baseline.clone()),
        (ArtifactKind::CurrentImage, artifacts.current.clone()),
        (ArtifactKind::GrowthHeatmap, artifacts.heatmap.clone()),
    ];
    if let Some(tile) = &artifacts.satellite {
        sources.push((ArtifactKind::SatelliteTile, tile.clone()));
    }

    let evidence = sources
        .into_iter()
        .filter_map(|(kind, path)| {
            kind.grid_slot().map(|slot| EvidenceItem {
                kind,
                caption: kind.caption().to_string(),
                path,
                placement: Placement {
                    page: EVIDENCE_PAGE,
                    slot,
                },
            })
        })
        .collect();

    AuditReport {
        audit_id,
        project_id,
        generated_at,
        capture_timestamp: metadata.timestamp,
        location: metadata.location,
        metrics,
        satellite_verified: cross_check.is_match(),
        cross_check,
        trust,
        credits,
        artifacts,
        evidence,
    }
}

impl AuditReport {
    /// Text lines of the summary page, in display order.
    pub fn summary_lines(&self) -> Vec<String> {
        let location = match self.location.coordinates() {
            Some((lat, lon)) => format!("{lat:.6}, {lon:.6}"),
            None => "Not available".to_string(),
        };
        vec![
            format!("Project: {}", self.project_id),
            format!("Trust Score: {:.2}/100", self.trust.aggregate),
            format!("Verified Credits Minted: {:.4} tCO2", self.credits.t_co2),
            format!("Vegetation Growth: {:.2}%", self.metrics.growth_pct),
            format!("Disease/Stress: {:.2}%", self.metrics.disease_pct),
            format!("Location: {location}"),
            format!("Timestamp: {}", self.capture_timestamp),
        ]
    }

    /// Evidence item occupying a grid slot, if any.
    pub fn evidence_at(&self, slot: GridSlot) -> Option<&EvidenceItem> {
        self.evidence.iter().find(|e| e.placement.slot == slot)
    }
}

/// Turns a report model into a byte stream.
pub trait ReportRenderer {
    /// MIME type of the rendered output.
    fn content_type(&self) -> &'static str;

    /// File extension, without the dot.
    fn extension(&self) -> &'static str;

    fn render(&self, report: &AuditReport) -> AuditResult<Vec<u8>>;
}

/// Renders the report model as pretty-printed JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportRenderer;

impl ReportRenderer for JsonReportRenderer {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn render(&self, report: &AuditReport) -> AuditResult<Vec<u8>> {
        serde_json::to_vec_pretty(report).map_err(|e| AuditError::Render(e.to_string()))
    }
}
