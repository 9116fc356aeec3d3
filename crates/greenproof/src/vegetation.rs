//! Vegetation and disease coverage via HSV color-band masking.
//!
//! Hue, saturation and value follow the common 8-bit convention: hue is
//! degrees halved (0..180), saturation and value span 0..255.

use image::RgbImage;

/// An inclusive hue band with minimum saturation and value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorBand {
    pub hue_min: u8,
    pub hue_max: u8,
    pub min_saturation: u8,
    pub min_value: u8,
}

impl ColorBand {
    pub fn contains(&self, [h, s, v]: [u8; 3]) -> bool {
        (self.hue_min..=self.hue_max).contains(&h) && s >= self.min_saturation && v >= self.min_value
    }
}

/// Healthy green foliage.
pub const GREEN_BAND: ColorBand = ColorBand {
    hue_min: 25,
    hue_max: 85,
    min_saturation: 40,
    min_value: 40,
};

/// Yellowing or browning foliage.
pub const DISEASE_BAND: ColorBand = ColorBand {
    hue_min: 10,
    hue_max: 35,
    min_saturation: 30,
    min_value: 30,
};

/// Convert one RGB pixel to 8-bit HSV.
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;

    let s = if v == 0.0 { 0.0 } else { 255.0 * diff / v };

    let mut h = if diff == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / diff
    } else if v == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    let h = ((h / 2.0).round() as u32 % 180) as u8;
    [h, s.round() as u8, v as u8]
}

/// Percentage (0..=100) of pixels falling inside `band`.
pub fn band_coverage(img: &RgbImage, band: &ColorBand) -> f64 {
    let total = img.width() as u64 * img.height() as u64;
    if total == 0 {
        return 0.0;
    }

    let matched = img
        .pixels()
        .filter(|p| band.contains(rgb_to_hsv(p.0)))
        .count() as u64;

    matched as f64 / total as f64 * 100.0
}

/// Healthy vegetation coverage in percent.
pub fn green_coverage(img: &RgbImage) -> f64 {
    band_coverage(img, &GREEN_BAND)
}

/// Diseased or stressed vegetation coverage in percent.
pub fn disease_coverage(img: &RgbImage) -> f64 {
    band_coverage(img, &DISEASE_BAND)
}
