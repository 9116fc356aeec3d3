//! Growth heatmap: where the plot changed between the two captures.

use image::{Rgb, RgbImage};

use crate::capture::{luma_bt601, ImagePair};

/// Weight of the current image in the heatmap overlay.
const OVERLAY_IMAGE_WEIGHT: f32 = 0.6;

/// Weight of the false-color difference in the heatmap overlay.
const OVERLAY_HEAT_WEIGHT: f32 = 0.4;

/// Render the change heatmap blended over the current image.
///
/// The BT.601 luma absolute difference is stretched to the full 0..255 range,
/// false-colored with a jet ramp, and blended 60/40 with the current image.
pub fn growth_heatmap(pair: &ImagePair) -> RgbImage {
    let gray_a = luma_bt601(&pair.baseline);
    let gray_b = luma_bt601(&pair.current);

    let diff: Vec<u8> = gray_a
        .as_raw()
        .iter()
        .zip(gray_b.as_raw().iter())
        .map(|(&a, &b)| a.abs_diff(b))
        .collect();

    let lo = diff.iter().copied().min().unwrap_or(0);
    let hi = diff.iter().copied().max().unwrap_or(0);
    let span = (hi - lo) as f32;

    let (w, h) = pair.current.dimensions();
    let mut out = RgbImage::new(w, h);

    for ((x, y, px), d) in out.enumerate_pixels_mut().zip(diff.iter()) {
        let level = if span > 0.0 {
            ((*d - lo) as f32 * 255.0 / span).round() as u8
        } else {
            0
        };
        let heat = jet(level);
        let base = pair.current.get_pixel(x, y).0;

        let mut blended = [0u8; 3];
        for c in 0..3 {
            let v = OVERLAY_IMAGE_WEIGHT * base[c] as f32 + OVERLAY_HEAT_WEIGHT * heat[c] as f32;
            blended[c] = v.round().clamp(0.0, 255.0) as u8;
        }
        *px = Rgb(blended);
    }

    out
}

/// Jet colormap: dark blue at 0 through cyan, yellow, to dark red at 255.
pub fn jet(level: u8) -> [u8; 3] {
    let x = level as f32 / 255.0;
    let ramp = |center: f32| ((1.5 - (4.0 * x - center).abs()).clamp(0.0, 1.0) * 255.0).round() as u8;
    [ramp(3.0), ramp(2.0), ramp(1.0)]
}
