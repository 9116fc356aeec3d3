//! Core data types for audit inputs, signals, and verdicts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One audit call: a baseline and a current photo of the same plot.
#[derive(Debug, Clone)]
pub struct AuditRequest {
    pub baseline: Vec<u8>,
    pub current: Vec<u8>,
    pub project_id: String,
}

/// Which of the two submitted images a value or failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSide {
    Baseline,
    Current,
}

impl fmt::Display for ImageSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSide::Baseline => f.write_str("baseline"),
            ImageSide::Current => f.write_str("current"),
        }
    }
}

/// Capture location decoded from the current image's geotag.
///
/// `Invalid` covers both a missing tag and a tag that failed to parse;
/// downstream stages never see coordinates they cannot trust.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GeoLocation {
    Invalid,
    Valid { lat: f64, lon: f64 },
}

impl GeoLocation {
    pub fn is_valid(&self) -> bool {
        matches!(self, GeoLocation::Valid { .. })
    }

    /// Decimal `(lat, lon)` when the location is valid.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match *self {
            GeoLocation::Valid { lat, lon } => Some((lat, lon)),
            GeoLocation::Invalid => None,
        }
    }
}

/// Capture metadata read from the current image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    /// Free-text capture time, passed through as recorded by the camera.
    pub timestamp: String,
    pub location: GeoLocation,
}

impl Default for CaptureMetadata {
    fn default() -> Self {
        Self {
            timestamp: UNKNOWN_TIMESTAMP.to_string(),
            location: GeoLocation::Invalid,
        }
    }
}

/// Placeholder timestamp when the image carries none.
pub const UNKNOWN_TIMESTAMP: &str = "Unknown";

/// Image-derived signals for one audit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetrics {
    /// Structural similarity in [0, 1].
    pub similarity: f64,
    pub previous_green_pct: f64,
    pub current_green_pct: f64,
    /// `current_green_pct - previous_green_pct`, in [-100, 100].
    pub growth_pct: f64,
    /// Yellow/brown coverage of the current image, in [0, 100].
    pub disease_pct: f64,
}

impl AnalysisMetrics {
    pub fn new(
        similarity: f64,
        previous_green_pct: f64,
        current_green_pct: f64,
        disease_pct: f64,
    ) -> Self {
        Self {
            similarity,
            previous_green_pct,
            current_green_pct,
            growth_pct: current_green_pct - previous_green_pct,
            disease_pct,
        }
    }
}

/// Outcome of the satellite cross-check.
///
/// `matched` is only meaningful when `attempted` is true; a check is only
/// attempted for a valid location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CrossCheck {
    pub attempted: bool,
    pub matched: bool,
}

impl CrossCheck {
    pub fn not_attempted() -> Self {
        Self {
            attempted: false,
            matched: false,
        }
    }

    pub fn attempted(matched: bool) -> Self {
        Self {
            attempted: true,
            matched,
        }
    }

    pub fn is_match(&self) -> bool {
        self.attempted && self.matched
    }
}

/// Five sub-scores in [0, 1] and their weighted aggregate in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrustScoreBreakdown {
    pub growth: f64,
    pub health: f64,
    pub fidelity: f64,
    pub location: f64,
    pub map_match: f64,
    pub aggregate: f64,
}

/// Estimated sequestration attributed to the observed growth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreditEstimate {
    pub area_hectares: f64,
    /// tCO2 per hectare per year.
    pub sequestration_rate: f64,
    pub growth_factor: f64,
    pub health_factor: f64,
    /// Published credit quantity, never negative.
    pub t_co2: f64,
}

/// Errors that can occur in the audit library.
#[derive(thiserror::Error, Debug)]
pub enum AuditError {
    #[error("Unreadable {side} image: {reason}")]
    UnreadableImage { side: ImageSide, reason: String },

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuditError {
    pub fn unreadable(side: ImageSide, reason: impl fmt::Display) -> Self {
        AuditError::UnreadableImage {
            side,
            reason: reason.to_string(),
        }
    }

    pub fn is_unreadable_image(&self) -> bool {
        matches!(self, AuditError::UnreadableImage { .. })
    }
}

impl From<image::ImageError> for AuditError {
    fn from(e: image::ImageError) -> Self {
        AuditError::Encode(e.to_string())
    }
}

/// Convenience result type.
pub type AuditResult<T> = Result<T, AuditError>;
