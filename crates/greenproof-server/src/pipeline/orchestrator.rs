//! Per-request audit pipeline.
//!
//! Decoding and every image computation run on the blocking pool; the tile
//! fetch runs on the async runtime alongside them. The orchestrator holds no
//! per-request state, so one instance is shared behind an `Arc`.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::{spawn_blocking, JoinHandle};
use tracing::Instrument;
use uuid::Uuid;

use greenproof::capture::ARTIFACT_JPEG_QUALITY;
use greenproof::{
    disease_coverage, encode_jpeg, error_level_analysis, estimate_credits, extract_metadata,
    green_coverage, growth_heatmap, normalize_pair, score_trust, structural_similarity,
    synthesize_report, AnalysisMetrics, AuditReport, AuditRequest, ImagePair, ReportArtifacts,
    ReportInputs, ReportRenderer, ScoringPolicy,
};

use super::artifacts::{ArtifactFile, ArtifactStore};
use crate::satellite::{CrossValidator, SatelliteOutcome};
use crate::types::{AnalyzeResponse, ServiceError, ServiceResult};

/// Everything one audit produced.
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub report: AuditReport,
    pub report_path: PathBuf,
    pub response: AnalyzeResponse,
}

/// Image-side results gathered before scoring.
struct Analysis {
    metrics: AnalysisMetrics,
    heatmap: image::RgbImage,
    ela: image::RgbImage,
}

/// Runs audits end to end.
pub struct AuditOrchestrator {
    store: ArtifactStore,
    validator: CrossValidator,
    renderer: Arc<dyn ReportRenderer + Send + Sync>,
    policy: ScoringPolicy,
}

impl AuditOrchestrator {
    pub fn new(
        store: ArtifactStore,
        validator: CrossValidator,
        renderer: Arc<dyn ReportRenderer + Send + Sync>,
        policy: ScoringPolicy,
    ) -> Self {
        Self {
            store,
            validator,
            renderer,
            policy,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn validator(&self) -> &CrossValidator {
        &self.validator
    }

    /// Run one audit. An error means no report was produced.
    pub async fn run(&self, request: AuditRequest) -> ServiceResult<AuditOutcome> {
        let audit_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("audit", id = %audit_id, project = %request.project_id);
        self.run_with_id(audit_id, request).instrument(span).await
    }

    async fn run_with_id(&self, audit_id: String, request: AuditRequest) -> ServiceResult<AuditOutcome> {
        let AuditRequest {
            baseline,
            current,
            project_id,
        } = request;
        tracing::info!(
            "Audit started ({} + {} bytes)",
            baseline.len(),
            current.len()
        );

        let current = Arc::new(current);
        let metadata_task = {
            let bytes = Arc::clone(&current);
            spawn_blocking(move || extract_metadata(&bytes))
        };

        let pair = {
            let current = Arc::clone(&current);
            spawn_blocking(move || normalize_pair(&baseline, &current)).await??
        };
        let pair = Arc::new(pair);
        let (w, h) = pair.dimensions();
        tracing::info!("Normalized pair to {w}x{h}");

        let verification = async {
            let metadata = metadata_task.await?;
            let satellite = self.validator.validate(&metadata.location).await;
            Ok::<_, ServiceError>((metadata, satellite))
        };
        let (analysis, verification) = tokio::join!(analyze(Arc::clone(&pair)), verification);
        let Analysis { metrics, heatmap, ela } = analysis?;
        let (metadata, SatelliteOutcome { cross_check, tile }) = verification?;

        let trust = score_trust(&metrics, &metadata.location, &cross_check, &self.policy);
        let credits = estimate_credits(&metrics, &self.policy);
        tracing::info!(
            "Scored: trust {:.2}/100, credits {:.4} tCO2, growth {:.2}%, disease {:.2}%",
            trust.aggregate,
            credits.t_co2,
            metrics.growth_pct,
            metrics.disease_pct
        );

        let artifacts = {
            let store = self.store.clone();
            let id = audit_id.clone();
            let pair = Arc::clone(&pair);
            spawn_blocking(move || persist_evidence(&store, &id, &pair, &heatmap, &ela, tile)).await??
        };

        let report = synthesize_report(ReportInputs {
            audit_id: audit_id.clone(),
            project_id,
            generated_at: Utc::now(),
            metadata,
            metrics,
            cross_check,
            trust,
            credits,
            artifacts,
        });

        let report_path = {
            let store = self.store.clone();
            let renderer = Arc::clone(&self.renderer);
            let report = report.clone();
            spawn_blocking(move || -> ServiceResult<PathBuf> {
                let bytes = renderer.render(&report)?;
                let file = ArtifactFile::Report(renderer.extension());
                Ok(store.persist(&report.audit_id, file, &bytes)?)
            })
            .await??
        };
        tracing::info!("Report written to {}", report_path.display());

        let response = AnalyzeResponse::from_report(&report, &report_path);
        Ok(AuditOutcome {
            report,
            report_path,
            response,
        })
    }
}

/// Run each image computation as its own blocking task and join them.
async fn analyze(pair: Arc<ImagePair>) -> ServiceResult<Analysis> {
    let similarity = on_pair(&pair, structural_similarity);
    let previous_green = on_pair(&pair, |p| green_coverage(&p.baseline));
    let current_green = on_pair(&pair, |p| green_coverage(&p.current));
    let disease = on_pair(&pair, |p| disease_coverage(&p.current));
    let heatmap = on_pair(&pair, growth_heatmap);
    let ela = on_pair(&pair, |p| error_level_analysis(&p.current_native));

    let (similarity, previous_green, current_green, disease, heatmap, ela) =
        tokio::join!(similarity, previous_green, current_green, disease, heatmap, ela);

    let metrics = AnalysisMetrics::new(similarity?, previous_green?, current_green?, disease?);
    tracing::debug!("Similarity {:.4}", metrics.similarity);

    Ok(Analysis {
        metrics,
        heatmap: heatmap?,
        ela: ela??,
    })
}

fn on_pair<T, F>(pair: &Arc<ImagePair>, f: F) -> JoinHandle<T>
where
    F: FnOnce(&ImagePair) -> T + Send + 'static,
    T: Send + 'static,
{
    let pair = Arc::clone(pair);
    spawn_blocking(move || f(&pair))
}

fn persist_evidence(
    store: &ArtifactStore,
    audit_id: &str,
    pair: &ImagePair,
    heatmap: &image::RgbImage,
    ela: &image::RgbImage,
    tile: Option<Vec<u8>>,
) -> ServiceResult<ReportArtifacts> {
    let jpeg = |img: &image::RgbImage| encode_jpeg(img, ARTIFACT_JPEG_QUALITY);

    let baseline = store.persist(audit_id, ArtifactFile::Baseline, &jpeg(&pair.baseline)?)?;
    let current = store.persist(audit_id, ArtifactFile::Current, &jpeg(&pair.current_native)?)?;
    let heatmap = store.persist(audit_id, ArtifactFile::Heatmap, &jpeg(heatmap)?)?;
    let forgery_residual = store.persist(audit_id, ArtifactFile::Ela, &jpeg(ela)?)?;
    let satellite = tile
        .map(|bytes| store.persist(audit_id, ArtifactFile::Satellite, &bytes))
        .transpose()?;

    Ok(ReportArtifacts {
        baseline,
        current,
        heatmap,
        forgery_residual,
        satellite,
    })
}
