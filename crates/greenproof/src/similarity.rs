//! Structural similarity (SSIM) between the aligned baseline and current images.

use image::GrayImage;

use crate::capture::{luma_bt601, ImagePair};

/// Side length of the uniform SSIM window.
pub const SSIM_WINDOW: usize = 7;

const K1: f64 = 0.01;
const K2: f64 = 0.03;
const DATA_RANGE: f64 = 255.0;

/// Mean SSIM of the BT.601 luma pair, clamped to [0, 1].
pub fn structural_similarity(pair: &ImagePair) -> f64 {
    let a = luma_bt601(&pair.baseline);
    let b = luma_bt601(&pair.current);
    ssim_gray(&a, &b)
}

/// Windowed SSIM over two equal-size grayscale images.
///
/// Uses a 7x7 uniform window with sample covariance and averages over every
/// window that lies fully inside the image. An image smaller than the window
/// is treated as a single window. Mismatched sizes score 0.
pub fn ssim_gray(a: &GrayImage, b: &GrayImage) -> f64 {
    if a.dimensions() != b.dimensions() || a.width() == 0 || a.height() == 0 {
        return 0.0;
    }

    let w = a.width() as usize;
    let h = a.height() as usize;
    let win_w = SSIM_WINDOW.min(w);
    let win_h = SSIM_WINDOW.min(h);

    let n = (win_w * win_h) as f64;
    let cov_norm = if n > 1.0 { n / (n - 1.0) } else { 1.0 };
    let c1 = (K1 * DATA_RANGE).powi(2);
    let c2 = (K2 * DATA_RANGE).powi(2);

    let pa = a.as_raw();
    let pb = b.as_raw();

    // Per-column sums over the current band of `win_h` rows.
    let mut cols = vec![Sums::default(); w];
    for y in 0..win_h {
        for (x, col) in cols.iter_mut().enumerate() {
            col.add_pixel(pa[y * w + x], pb[y * w + x]);
        }
    }

    let mut total = 0.0;
    let mut windows = 0u64;

    for top in 0..=(h - win_h) {
        if top > 0 {
            let out = top - 1;
            let inc = top + win_h - 1;
            for (x, col) in cols.iter_mut().enumerate() {
                col.sub_pixel(pa[out * w + x], pb[out * w + x]);
                col.add_pixel(pa[inc * w + x], pb[inc * w + x]);
            }
        }

        let mut acc = Sums::default();
        for col in &cols[..win_w] {
            acc.add(col);
        }

        for left in 0..=(w - win_w) {
            if left > 0 {
                acc.sub(&cols[left - 1]);
                acc.add(&cols[left + win_w - 1]);
            }
            total += acc.ssim(n, cov_norm, c1, c2);
            windows += 1;
        }
    }

    (total / windows as f64).clamp(0.0, 1.0)
}

/// Exact integer moments of one window (or one window column).
#[derive(Debug, Clone, Copy, Default)]
struct Sums {
    x: u64,
    y: u64,
    xx: u64,
    yy: u64,
    xy: u64,
}

impl Sums {
    fn add_pixel(&mut self, a: u8, b: u8) {
        let (a, b) = (a as u64, b as u64);
        self.x += a;
        self.y += b;
        self.xx += a * a;
        self.yy += b * b;
        self.xy += a * b;
    }

    fn sub_pixel(&mut self, a: u8, b: u8) {
        let (a, b) = (a as u64, b as u64);
        self.x -= a;
        self.y -= b;
        self.xx -= a * a;
        self.yy -= b * b;
        self.xy -= a * b;
    }

    fn add(&mut self, o: &Sums) {
        self.x += o.x;
        self.y += o.y;
        self.xx += o.xx;
        self.yy += o.yy;
        self.xy += o.xy;
    }

    fn sub(&mut self, o: &Sums) {
        self.x -= o.x;
        self.y -= o.y;
        self.xx -= o.xx;
        self.yy -= o.yy;
        self.xy -= o.xy;
    }

    fn ssim(&self, n: f64, cov_norm: f64, c1: f64, c2: f64) -> f64 {
        let ux = self.x as f64 / n;
        let uy = self.y as f64 / n;
        let vx = cov_norm * (self.xx as f64 / n - ux * ux);
        let vy = cov_norm * (self.yy as f64 / n - uy * uy);
        let vxy = cov_norm * (self.xy as f64 / n - ux * uy);

        let num = (2.0 * ux * uy + c1) * (2.0 * vxy + c2);
        let den = (ux * ux + uy * uy + c1) * (vx + vy + c2);
        num / den
    }
}
