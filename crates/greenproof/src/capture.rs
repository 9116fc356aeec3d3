//! Image decoding and pair alignment.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma, RgbImage};

use crate::types::{AuditError, AuditResult, ImageSide};

/// JPEG quality used for every artifact this crate encodes.
pub const ARTIFACT_JPEG_QUALITY: u8 = 90;

/// Whether this build decodes HEIC/HEIF uploads.
pub const HEIC_SUPPORTED: bool = cfg!(feature = "heic");

/// ISO-BMFF brands that identify HEIC/HEIF stills.
const HEIF_BRANDS: [&[u8; 4]; 8] = [
    b"heic", b"heix", b"hevc", b"hevx", b"heim", b"heis", b"mif1", b"msf1",
];

/// Baseline and current images decoded to RGB with identical dimensions.
#[derive(Debug, Clone)]
pub struct ImagePair {
    pub baseline: RgbImage,
    /// Current image resampled to the baseline's dimensions.
    pub current: RgbImage,
    /// Current image at its native resolution, for forensics and evidence.
    pub current_native: RgbImage,
}

impl ImagePair {
    /// Pair two images that already share dimensions.
    pub fn aligned(baseline: RgbImage, current: RgbImage) -> Self {
        debug_assert_eq!(baseline.dimensions(), current.dimensions());
        Self {
            baseline,
            current_native: current.clone(),
            current,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.baseline.dimensions()
    }
}

/// Decode both images and resize the current one to the baseline's size.
///
/// Either image failing to decode is fatal for the whole audit.
pub fn normalize_pair(baseline: &[u8], current: &[u8]) -> AuditResult<ImagePair> {
    let baseline = decode_image(baseline, ImageSide::Baseline)?.to_rgb8();
    let current_native = decode_image(current, ImageSide::Current)?.to_rgb8();

    let (w, h) = baseline.dimensions();
    let current = if current_native.dimensions() == (w, h) {
        current_native.clone()
    } else {
        tracing::debug!(
            "Resizing current image {}x{} to baseline {w}x{h}",
            current_native.width(),
            current_native.height()
        );
        image::imageops::resize(&current_native, w, h, FilterType::Triangle)
    };

    Ok(ImagePair {
        baseline,
        current,
        current_native,
    })
}

/// Decode raw bytes of any supported encoding.
pub fn decode_image(bytes: &[u8], side: ImageSide) -> AuditResult<DynamicImage> {
    if bytes.is_empty() {
        return Err(AuditError::unreadable(side, "empty input"));
    }

    let img = if is_heif(bytes) {
        decode_heif(bytes).map_err(|reason| AuditError::unreadable(side, reason))?
    } else {
        image::load_from_memory(bytes).map_err(|e| AuditError::unreadable(side, e))?
    };

    if img.width() == 0 || img.height() == 0 {
        return Err(AuditError::unreadable(side, "zero-sized image"));
    }
    Ok(img)
}

/// Check for an ISO-BMFF `ftyp` box carrying a HEIF brand.
pub fn is_heif(bytes: &[u8]) -> bool {
    if bytes.len() < 12 || &bytes[4..8] != b"ftyp" {
        return false;
    }
    HEIF_BRANDS.iter().any(|brand| &bytes[8..12] == *brand)
}

#[cfg(feature = "heic")]
fn decode_heif(bytes: &[u8]) -> Result<DynamicImage, String> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let lib = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(bytes).map_err(|e| e.to_string())?;
    let handle = ctx.primary_image_handle().map_err(|e| e.to_string())?;
    let decoded = lib
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(|e| e.to_string())?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| "HEIF image has no interleaved RGB plane".to_string())?;

    let row_len = plane.width as usize * 3;
    let mut buf = Vec::with_capacity(row_len * plane.height as usize);
    for row in 0..plane.height as usize {
        let start = row * plane.stride;
        buf.extend_from_slice(&plane.data[start..start + row_len]);
    }

    RgbImage::from_raw(plane.width, plane.height, buf)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| "HEIF plane size mismatch".to_string())
}

#[cfg(not(feature = "heic"))]
fn decode_heif(_bytes: &[u8]) -> Result<DynamicImage, String> {
    Err("HEIC/HEIF input requires the `heic` feature".to_string())
}

/// Convert to 8-bit luma with BT.601 weights (0.299, 0.587, 0.114).
///
/// Fixed point in 14 bits with round-half-up, matching the usual
/// RGB-to-gray conversion in OpenCV.
pub fn luma_bt601(img: &RgbImage) -> GrayImage {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    const SHIFT: u32 = 14;

    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b] = img.get_pixel(x, y).0;
        let level = (R * r as u32 + G * g as u32 + B * b as u32 + (1 << (SHIFT - 1))) >> SHIFT;
        Luma([level.min(255) as u8])
    })
}

/// Encode an RGB buffer as JPEG.
pub fn encode_jpeg(img: &RgbImage, quality: u8) -> AuditResult<Vec<u8>> {
    let mut buf = Vec::new();
    let mut cursor = Cursor::new(&mut buf);
    let encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
    img.write_with_encoder(encoder)?;
    Ok(buf)
}

/// Encode an RGB buffer as PNG.
pub fn encode_png(img: &RgbImage) -> AuditResult<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}
