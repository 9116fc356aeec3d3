//! GreenProof core library for vegetation growth audits: image normalization,
//! geotag extraction, similarity and coverage analysis, trust scoring, and reports.

pub mod capture;
pub mod diff;
pub mod forensics;
pub mod metadata;
pub mod report;
pub mod scoring;
pub mod similarity;
pub mod types;
pub mod vegetation;

pub use capture::{
    decode_image, encode_jpeg, encode_png, luma_bt601, normalize_pair, ImagePair, HEIC_SUPPORTED,
};
pub use diff::growth_heatmap;
pub use forensics::error_level_analysis;
pub use metadata::{extract_location, extract_metadata, GeotagError};
pub use report::{
    synthesize_report, ArtifactKind, AuditReport, JsonReportRenderer, ReportArtifacts,
    ReportInputs, ReportRenderer,
};
pub use scoring::{estimate_credits, score_trust, FidelityCurve, ScoringPolicy};
pub use similarity::structural_similarity;
pub use types::*;
pub use vegetation::{disease_coverage, green_coverage};
