//! Tile provider seam and the static-map HTTP client.

use std::time::Duration;

use async_trait::async_trait;

/// Zoom level of a requested tile; about 40 m across at the equator.
pub const TILE_ZOOM: u8 = 20;

/// Edge length of a requested tile, in pixels.
pub const TILE_SIZE_PX: u32 = 600;

/// Why a tile fetch failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TileError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("provider returned HTTP {0}")]
    Status(u16),

    #[error("provider returned an empty body")]
    EmptyBody,
}

impl TileError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            TileError::Transport(_) | TileError::Timeout => true,
            TileError::Status(code) => *code >= 500 || *code == 429,
            TileError::EmptyBody => false,
        }
    }
}

/// Anything that can return a satellite tile centred on a coordinate.
#[async_trait]
pub trait TileProvider: Send + Sync {
    async fn fetch_tile(&self, lat: f64, lon: f64) -> Result<Vec<u8>, TileError>;
}

/// Fetches tiles from a Google Static Maps compatible endpoint.
#[derive(Clone)]
pub struct StaticMapClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl StaticMapClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("greenproof/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TileProvider for StaticMapClient {
    async fn fetch_tile(&self, lat: f64, lon: f64) -> Result<Vec<u8>, TileError> {
        let center = format!("{lat},{lon}");
        let zoom = TILE_ZOOM.to_string();
        let size = format!("{TILE_SIZE_PX}x{TILE_SIZE_PX}");

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("center", center.as_str()),
                ("zoom", zoom.as_str()),
                ("size", size.as_str()),
                ("maptype", "satellite"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(classify)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TileError::Status(status.as_u16()));
        }

        let body = resp.bytes().await.map_err(classify)?;
        if body.is_empty() {
            return Err(TileError::EmptyBody);
        }
        Ok(body.to_vec())
    }
}

fn classify(e: reqwest::Error) -> TileError {
    if e.is_timeout() {
        TileError::Timeout
    } else {
        TileError::Transport(e.to_string())
    }
}
