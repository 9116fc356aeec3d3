//! Bounded-retry cross-validation of a geotag against a satellite tile.
//!
//! The validator never fails an audit. Every outcome collapses to a
//! [`CrossCheck`] plus, on success, the tile bytes for the evidence page.

use std::sync::Arc;
use std::time::Duration;

use greenproof::{CrossCheck, GeoLocation};

use super::provider::{TileError, TileProvider};

/// Retry and timeout settings for tile fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    /// Delay before the second attempt; doubles for each one after.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(10),
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// What the cross-check produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatelliteOutcome {
    pub cross_check: CrossCheck,
    /// Tile bytes, present iff the check matched.
    pub tile: Option<Vec<u8>>,
}

impl SatelliteOutcome {
    fn skipped() -> Self {
        Self {
            cross_check: CrossCheck::not_attempted(),
            tile: None,
        }
    }

    fn failed() -> Self {
        Self {
            cross_check: CrossCheck::attempted(false),
            tile: None,
        }
    }
}

/// Resolves a [`GeoLocation`] to a [`SatelliteOutcome`].
#[derive(Clone)]
pub struct CrossValidator {
    provider: Option<Arc<dyn TileProvider>>,
    retry: RetryPolicy,
}

impl CrossValidator {
    pub fn new(provider: Arc<dyn TileProvider>, retry: RetryPolicy) -> Self {
        Self {
            provider: Some(provider),
            retry,
        }
    }

    /// A validator with no provider. Valid locations record a failed check.
    pub fn disabled() -> Self {
        Self {
            provider: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub async fn validate(&self, location: &GeoLocation) -> SatelliteOutcome {
        let Some((lat, lon)) = location.coordinates() else {
            return SatelliteOutcome::skipped();
        };
        let Some(provider) = &self.provider else {
            tracing::debug!("Cross-validation unavailable: no tile provider configured");
            return SatelliteOutcome::failed();
        };

        match self.fetch_with_retry(provider.as_ref(), lat, lon).await {
            Ok(tile) => {
                tracing::info!("Satellite tile matched ({} bytes)", tile.len());
                SatelliteOutcome {
                    cross_check: CrossCheck::attempted(true),
                    tile: Some(tile),
                }
            }
            Err(e) => {
                tracing::warn!("Satellite cross-validation failed: {e}");
                SatelliteOutcome::failed()
            }
        }
    }

    async fn fetch_with_retry(
        &self,
        provider: &dyn TileProvider,
        lat: f64,
        lon: f64,
    ) -> Result<Vec<u8>, TileError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = tokio::time::timeout(self.retry.attempt_timeout, provider.fetch_tile(lat, lon))
                .await
                .unwrap_or(Err(TileError::Timeout));

            match result {
                Ok(tile) => return Ok(tile),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    tracing::debug!("Tile attempt {attempt}/{max_attempts} failed ({e}); retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
