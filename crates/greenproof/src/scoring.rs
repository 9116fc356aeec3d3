//! Trust score fusion and carbon credit estimation.
//!
//! Everything here is a pure function of already-resolved signals. The
//! satellite check arrives as a plain [`CrossCheck`]; no I/O happens here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{AnalysisMetrics, CreditEstimate, CrossCheck, GeoLocation, TrustScoreBreakdown};

/// Weight of each of the five sub-scores in the aggregate.
pub const SUBSCORE_WEIGHT: f64 = 0.20;

/// Growth (in percentage points) that earns a full growth sub-score.
const FULL_GROWTH_PCT: f64 = 20.0;

/// Disease coverage (percent) at which the health sub-score bottoms out.
const MAX_DISEASE_PCT: f64 = 50.0;

/// Similarity below which the two photos are treated as different sites.
const FIDELITY_FLOOR: f64 = 0.6;

/// Ground area of a zoom-20 satellite tile (about 40 m x 40 m).
pub const DEFAULT_AREA_HECTARES: f64 = 0.16;

/// Average sequestration, tCO2 per hectare per year.
pub const DEFAULT_SEQUESTRATION_RATE: f64 = 15.0;

/// How image similarity maps to the fidelity sub-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FidelityCurve {
    /// Rises linearly from 0 at similarity 0.6 to 1 at 0.9 and above.
    /// Unrelated photos score 0.
    #[default]
    SiteMatch,
    /// `1 - clamp(similarity - 0.6, 0, 0.4) / 0.4`: near-duplicate photos
    /// score 0, anything at or below 0.6 scores 1.
    DuplicatePenalty,
}

impl FidelityCurve {
    pub fn score(self, similarity: f64) -> f64 {
        let s = finite_or_zero(similarity);
        match self {
            FidelityCurve::SiteMatch => ((s - FIDELITY_FLOOR) / 0.3).clamp(0.0, 1.0),
            FidelityCurve::DuplicatePenalty => 1.0 - (s - FIDELITY_FLOOR).clamp(0.0, 0.4) / 0.4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FidelityCurve::SiteMatch => "site_match",
            FidelityCurve::DuplicatePenalty => "duplicate_penalty",
        }
    }
}

impl fmt::Display for FidelityCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FidelityCurve {
    type Err = String;

    /// Accepts `site_match` / `duplicate_penalty`, case-insensitive, with
    /// `-` and `_` interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "site_match" => Ok(FidelityCurve::SiteMatch),
            "duplicate_penalty" => Ok(FidelityCurve::DuplicatePenalty),
            other => Err(format!(
                "unknown fidelity curve '{other}' (expected site_match or duplicate_penalty)"
            )),
        }
    }
}

/// Fixed physical assumptions and score shaping, set once from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub area_hectares: f64,
    pub sequestration_rate: f64,
    pub fidelity_curve: FidelityCurve,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            area_hectares: DEFAULT_AREA_HECTARES,
            sequestration_rate: DEFAULT_SEQUESTRATION_RATE,
            fidelity_curve: FidelityCurve::default(),
        }
    }
}

/// Fuse all signals into the five sub-scores and the 0..=100 aggregate.
pub fn score_trust(
    metrics: &AnalysisMetrics,
    location: &GeoLocation,
    cross_check: &CrossCheck,
    policy: &ScoringPolicy,
) -> TrustScoreBreakdown {
    let growth = (finite_or_zero(metrics.growth_pct) / FULL_GROWTH_PCT).clamp(0.0, 1.0);
    let health = 1.0 - finite_or_zero(metrics.disease_pct).clamp(0.0, MAX_DISEASE_PCT) / MAX_DISEASE_PCT;
    let fidelity = policy.fidelity_curve.score(metrics.similarity);
    let location = if location.is_valid() { 1.0 } else { 0.0 };
    let map_match = if cross_check.is_match() { 1.0 } else { 0.0 };

    TrustScoreBreakdown {
        growth,
        health,
        fidelity,
        location,
        map_match,
        aggregate: weighted_aggregate(&[growth, health, fidelity, location, map_match]),
    }
}

impl TrustScoreBreakdown {
    /// Recompute the aggregate from the stored sub-scores.
    pub fn recomputed_aggregate(&self) -> f64 {
        weighted_aggregate(&[self.growth, self.health, self.fidelity, self.location, self.map_match])
    }
}

fn weighted_aggregate(subscores: &[f64; 5]) -> f64 {
    (100.0 * subscores.iter().map(|s| SUBSCORE_WEIGHT * s).sum::<f64>()).clamp(0.0, 100.0)
}

/// Convert observed growth into a credit estimate for one tile footprint.
///
/// Negative growth contributes nothing. The published figure is never
/// negative even if disease coverage were to exceed 100%.
pub fn estimate_credits(metrics: &AnalysisMetrics, policy: &ScoringPolicy) -> CreditEstimate {
    let growth_factor = (finite_or_zero(metrics.growth_pct) / 100.0).max(0.0);
    let health_factor = 1.0 - finite_or_zero(metrics.disease_pct) / 100.0;

    let raw = policy.area_hectares * policy.sequestration_rate * growth_factor * health_factor;
    let t_co2 = if raw.is_finite() && raw >= 0.0 {
        raw
    } else {
        tracing::warn!(
            "Credit estimate {raw} is not a publishable quantity (disease {}%); publishing 0",
            metrics.disease_pct
        );
        0.0
    };

    CreditEstimate {
        area_hectares: policy.area_hectares,
        sequestration_rate: policy.sequestration_rate,
        growth_factor,
        health_factor,
        t_co2,
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
