//! Satellite cross-validation: tile providers and the retrying validator.

pub mod provider;
pub mod validator;

pub use provider::{StaticMapClient, TileError, TileProvider, TILE_ZOOM};
pub use validator::{CrossValidator, RetryPolicy, SatelliteOutcome};
