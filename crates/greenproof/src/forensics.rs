//! Error level analysis of the current image.
//!
//! Regions pasted in from another source tend to recompress differently from
//! the rest of the frame and light up in the residual. The residual is
//! evidence for a human reviewer only; it does not feed the trust score.

use image::{ImageFormat, Rgb, RgbImage};

use crate::capture::encode_jpeg;
use crate::types::AuditResult;

/// JPEG quality of the reference recompression.
pub const ELA_QUALITY: u8 = 90;

/// Brightness gain applied to the residual so faint differences are visible.
pub const ELA_GAIN: f32 = 30.0;

/// Amplified per-pixel difference between `img` and its JPEG recompression.
pub fn error_level_analysis(img: &RgbImage) -> AuditResult<RgbImage> {
    let jpeg = encode_jpeg(img, ELA_QUALITY)?;
    let recompressed = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg)?.to_rgb8();

    let residual = RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let a = img.get_pixel(x, y).0;
        let b = recompressed.get_pixel(x, y).0;
        Rgb([amplify(a[0], b[0]), amplify(a[1], b[1]), amplify(a[2], b[2])])
    });

    Ok(residual)
}

fn amplify(a: u8, b: u8) -> u8 {
    (a.abs_diff(b) as f32 * ELA_GAIN).min(255.0) as u8
}
