//! Shared fixtures for the service integration tests.
#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use image::{Rgb, RgbImage};

use greenproof::capture::ARTIFACT_JPEG_QUALITY;
use greenproof::{encode_jpeg, encode_png, ScoringPolicy};
use greenproof_server::pipeline::{ArtifactStore, AuditOrchestrator};
use greenproof_server::satellite::{CrossValidator, RetryPolicy, TileError, TileProvider};
use greenproof_server::PdfReportRenderer;

const LEAF: Rgb<u8> = Rgb([40, 160, 40]);
const SOIL: Rgb<u8> = Rgb([128, 128, 128]);

// ─────────────────────── images ───────────────────────

/// A plot photo whose left `green_cols` columns are foliage.
pub fn plot_image(green_cols: u32) -> RgbImage {
    RgbImage::from_fn(64, 64, |x, _| if x < green_cols { LEAF } else { SOIL })
}

pub fn plot_jpeg(green_cols: u32) -> Vec<u8> {
    encode_jpeg(&plot_image(green_cols), ARTIFACT_JPEG_QUALITY).unwrap()
}

/// A small PNG standing in for a satellite tile.
pub fn tile_png() -> Vec<u8> {
    encode_png(&RgbImage::from_pixel(32, 32, Rgb([30, 90, 30]))).unwrap()
}

/// `plot_jpeg` with an EXIF block placing it at 10°30'36"N 73°57'36"W.
pub fn geotagged_plot_jpeg(green_cols: u32) -> Vec<u8> {
    let fields = [
        ascii(Tag::DateTime, "2024:05:01 10:00:00"),
        ascii(Tag::GPSLatitudeRef, "N"),
        dms(Tag::GPSLatitude, [(10, 1), (30, 1), (36, 1)]),
        ascii(Tag::GPSLongitudeRef, "W"),
        dms(Tag::GPSLongitude, [(73, 1), (57, 1), (36, 1)]),
    ];
    with_exif(&plot_jpeg(green_cols), &fields)
}

fn ascii(tag: Tag, s: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![s.as_bytes().to_vec()]),
    }
}

fn dms(tag: Tag, parts: [(u32, u32); 3]) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Rational(
            parts
                .iter()
                .map(|&(num, denom)| Rational { num, denom })
                .collect(),
        ),
    }
}

/// Insert an APP1 EXIF segment right after the JPEG SOI marker.
fn with_exif(jpeg: &[u8], fields: &[Field]) -> Vec<u8> {
    let mut writer = Writer::new();
    for f in fields {
        writer.push_field(f);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();
    let tiff = tiff.into_inner();

    let seg_len = (2 + 6 + tiff.len()) as u16;
    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
    out.extend_from_slice(&seg_len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

// ─────────────────────── tile providers ───────────────────────

/// Always returns the same tile.
pub struct FixedTile(pub Vec<u8>);

#[async_trait]
impl TileProvider for FixedTile {
    async fn fetch_tile(&self, _lat: f64, _lon: f64) -> Result<Vec<u8>, TileError> {
        Ok(self.0.clone())
    }
}

/// Always fails with a server error.
pub struct Unavailable;

#[async_trait]
impl TileProvider for Unavailable {
    async fn fetch_tile(&self, _lat: f64, _lon: f64) -> Result<Vec<u8>, TileError> {
        Err(TileError::Status(503))
    }
}

/// Never answers within a test's lifetime; flags when a fetch begins.
#[derive(Default)]
pub struct Stalled {
    pub started: AtomicBool,
}

#[async_trait]
impl TileProvider for Stalled {
    async fn fetch_tile(&self, _lat: f64, _lon: f64) -> Result<Vec<u8>, TileError> {
        self.started.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(TileError::Timeout)
    }
}

/// One attempt that waits far longer than any test.
pub fn patient_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 1,
        attempt_timeout: Duration::from_secs(3600),
        backoff: Duration::from_millis(1),
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        attempt_timeout: Duration::from_millis(200),
        backoff: Duration::from_millis(1),
    }
}

// ─────────────────────── orchestrators ───────────────────────

pub fn orchestrator(dir: &Path, validator: CrossValidator) -> Arc<AuditOrchestrator> {
    orchestrator_with_policy(dir, validator, ScoringPolicy::default())
}

pub fn orchestrator_with_policy(
    dir: &Path,
    validator: CrossValidator,
    policy: ScoringPolicy,
) -> Arc<AuditOrchestrator> {
    Arc::new(AuditOrchestrator::new(
        ArtifactStore::open(dir).unwrap(),
        validator,
        Arc::new(PdfReportRenderer),
        policy,
    ))
}

pub fn with_tile(dir: &Path) -> Arc<AuditOrchestrator> {
    orchestrator(
        dir,
        CrossValidator::new(Arc::new(FixedTile(tile_png())), fast_retry()),
    )
}

pub fn without_maps(dir: &Path) -> Arc<AuditOrchestrator> {
    orchestrator(dir, CrossValidator::disabled())
}

/// File names in `dir`, sorted.
pub fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
