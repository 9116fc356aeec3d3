//! Configuration loading and resolution.
//!
//! Every setting resolves once at startup: explicit value, then environment,
//! then compiled default.

use std::path::PathBuf;

use greenproof::{FidelityCurve, ScoringPolicy};

use crate::satellite::RetryPolicy;

/// Maps API key; absence disables satellite cross-validation.
pub const MAPS_API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

/// Directory receiving per-audit artifacts.
pub const ARTIFACT_DIR_ENV: &str = "GREENPROOF_ARTIFACT_DIR";

/// Override for the static-map endpoint.
pub const MAPS_BASE_URL_ENV: &str = "GREENPROOF_MAPS_BASE_URL";

/// Fidelity curve: `site_match` (default) or `duplicate_penalty`.
pub const FIDELITY_CURVE_ENV: &str = "GREENPROOF_FIDELITY_CURVE";

pub const DEFAULT_ARTIFACT_DIR: &str = "temp_audit_files";
pub const DEFAULT_MAPS_BASE_URL: &str = "https://maps.googleapis.com/maps/api/staticmap";
pub const DEFAULT_ADDR: &str = "127.0.0.1:8000";

/// Largest accepted multipart body.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Settings shared by the HTTP server and the one-shot `audit` command.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub artifact_dir: PathBuf,
    pub maps_api_key: Option<String>,
    pub maps_base_url: String,
    pub scoring: ScoringPolicy,
    pub retry: RetryPolicy,
}

impl ServiceConfig {
    pub fn resolve(
        artifact_dir: Option<&str>,
        maps_api_key: Option<&str>,
        maps_base_url: Option<&str>,
        fidelity_curve: Option<FidelityCurve>,
    ) -> Self {
        Self {
            artifact_dir: resolve_artifact_dir(artifact_dir),
            maps_api_key: resolve_maps_api_key(maps_api_key),
            maps_base_url: resolve_maps_base_url(maps_base_url),
            scoring: ScoringPolicy {
                fidelity_curve: resolve_fidelity_curve(fidelity_curve),
                ..ScoringPolicy::default()
            },
            retry: RetryPolicy::default(),
        }
    }

    /// A config rooted at `dir` with cross-validation disabled.
    pub fn with_artifact_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: dir.into(),
            maps_api_key: None,
            maps_base_url: DEFAULT_MAPS_BASE_URL.to_string(),
            scoring: ScoringPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn cross_validation_enabled(&self) -> bool {
        self.maps_api_key.is_some()
    }
}

/// Resolve the artifact directory.
pub fn resolve_artifact_dir(explicit: Option<&str>) -> PathBuf {
    if let Some(dir) = explicit {
        return PathBuf::from(dir);
    }

    if let Some(dir) = non_empty_env(ARTIFACT_DIR_ENV) {
        return PathBuf::from(dir);
    }

    PathBuf::from(DEFAULT_ARTIFACT_DIR)
}

/// Resolve the maps API key. Blank values count as absent.
pub fn resolve_maps_api_key(explicit: Option<&str>) -> Option<String> {
    explicit
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .or_else(|| non_empty_env(MAPS_API_KEY_ENV))
}

/// Resolve the static-map endpoint.
pub fn resolve_maps_base_url(explicit: Option<&str>) -> String {
    if let Some(url) = explicit {
        return url.to_string();
    }

    non_empty_env(MAPS_BASE_URL_ENV).unwrap_or_else(|| DEFAULT_MAPS_BASE_URL.to_string())
}

/// Resolve the fidelity curve. An unrecognised environment value is logged
/// and ignored.
pub fn resolve_fidelity_curve(explicit: Option<FidelityCurve>) -> FidelityCurve {
    if let Some(curve) = explicit {
        return curve;
    }

    non_empty_env(FIDELITY_CURVE_ENV)
        .and_then(|raw| parse_fidelity_curve(&raw))
        .unwrap_or_default()
}

fn parse_fidelity_curve(raw: &str) -> Option<FidelityCurve> {
    match raw.parse::<FidelityCurve>() {
        Ok(curve) => Some(curve),
        Err(e) => {
            tracing::warn!("{FIDELITY_CURVE_ENV}: {e}; using default");
            None
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_values_win() {
        assert_eq!(resolve_artifact_dir(Some("/srv/audits")), PathBuf::from("/srv/audits"));
        assert_eq!(resolve_maps_api_key(Some(" k-123 ")), Some("k-123".to_string()));
        assert_eq!(resolve_maps_base_url(Some("http://127.0.0.1:9/tiles")), "http://127.0.0.1:9/tiles");
    }

    #[test]
    fn test_blank_key_is_never_used() {
        // Falls through to the environment, which may or may not hold a key.
        let key = resolve_maps_api_key(Some("   "));
        assert_ne!(key.as_deref(), Some(""));
        assert_ne!(key.as_deref(), Some("   "));
    }

    #[test]
    fn test_explicit_site_match_curve() {
        assert_eq!(resolve_fidelity_curve(Some(FidelityCurve::SiteMatch)), FidelityCurve::SiteMatch);
        let config = ServiceConfig::resolve(None, None, None, Some(FidelityCurve::SiteMatch));
        assert_eq!(config.scoring.fidelity_curve, FidelityCurve::SiteMatch);
    }

    #[test]
    fn test_explicit_duplicate_penalty_curve() {
        assert_eq!(
            resolve_fidelity_curve(Some(FidelityCurve::DuplicatePenalty)),
            FidelityCurve::DuplicatePenalty
        );
        let config = ServiceConfig::resolve(None, None, None, Some(FidelityCurve::DuplicatePenalty));
        assert_eq!(config.scoring.fidelity_curve, FidelityCurve::DuplicatePenalty);
        assert_eq!(config.scoring.area_hectares, ScoringPolicy::default().area_hectares);
    }

    #[test]
    fn test_curve_env_values() {
        assert_eq!(parse_fidelity_curve("site_match"), Some(FidelityCurve::SiteMatch));
        assert_eq!(parse_fidelity_curve("duplicate_penalty"), Some(FidelityCurve::DuplicatePenalty));
        assert_eq!(parse_fidelity_curve("DUPLICATE-PENALTY"), Some(FidelityCurve::DuplicatePenalty));
        assert_eq!(parse_fidelity_curve("lenient"), None);
    }

    #[test]
    fn test_with_artifact_dir_defaults() {
        let config = ServiceConfig::with_artifact_dir("out");
        assert_eq!(config.artifact_dir, PathBuf::from("out"));
        assert_eq!(config.maps_base_url, DEFAULT_MAPS_BASE_URL);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.scoring.fidelity_curve, FidelityCurve::SiteMatch);
        assert!(!config.cross_validation_enabled());
    }
}
