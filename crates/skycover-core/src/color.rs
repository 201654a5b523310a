//! Color normalisation: sRGB → CIE L*a*b* (D65) followed by a per-channel
//! Gaussian blur.
//!
//! The blur is separable and uses a normalised kernel truncated at 4σ.
//! Samples beyond the border replicate the nearest edge pixel, so a uniform
//! image stays exactly uniform after smoothing.
use palette::{white_point::D65, FromColor, Lab, Srgb};

use crate::raster::Raster;
use crate::sky_image::SkyImage;

/// Kernel half-width in standard deviations.
const TRUNCATE_SIGMAS: f64 = 4.0;

/// Planar L*a*b* channels of one image.
#[derive(Debug, Clone)]
pub struct ColorField {
    /// L*, 0–100.
    pub lightness: Raster<f64>,
    /// a*, green (−) to red (+).
    pub chroma_a: Raster<f64>,
    /// b*, blue (−) to yellow (+).
    pub chroma_b: Raster<f64>,
}

impl ColorField {
    pub fn width(&self) -> usize {
        self.lightness.width
    }

    pub fn height(&self) -> usize {
        self.lightness.height
    }
}

/// Convert one 8-bit sRGB triple to L*a*b* under D65.
pub fn srgb_to_lab([r, g, b]: [u8; 3]) -> [f64; 3] {
    let srgb = Srgb::new(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);
    let lab: Lab<D65, f64> = Lab::from_color(srgb);
    [lab.l, lab.a, lab.b]
}

/// Per-pixel L*a*b* conversion, unsmoothed.
pub fn rgb_to_lab(image: &SkyImage) -> ColorField {
    let (w, h) = (image.width(), image.height());
    let mut l = Vec::with_capacity(w * h);
    let mut a = Vec::with_capacity(w * h);
    let mut b = Vec::with_capacity(w * h);

    for px in image.as_rgb().pixels() {
        let [lv, av, bv] = srgb_to_lab(px.0);
        l.push(lv);
        a.push(av);
        b.push(bv);
    }

    ColorField {
        lightness: Raster::from_vec(w, h, l),
        chroma_a: Raster::from_vec(w, h, a),
        chroma_b: Raster::from_vec(w, h, b),
    }
}

/// Normalised 1D Gaussian kernel of radius `round(4σ)`.
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (TRUNCATE_SIGMAS * sigma + 0.5) as usize;
    let two_s2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let d = i as f64 - radius as f64;
            (-d * d / two_s2).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Separable Gaussian blur with nearest-edge padding.
///
/// `sigma <= 0` (or NaN) returns an unmodified copy.
pub fn gaussian_blur(src: &Raster<f64>, sigma: f64) -> Raster<f64> {
    if sigma.is_nan() || sigma <= 0.0 || src.is_empty() {
        return src.clone();
    }
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;
    let (w, h) = (src.width, src.height);

    // Horizontal pass.
    let mut tmp = vec![0f64; w * h];
    for r in 0..h {
        let row = &src.data[r * w..(r + 1) * w];
        for c in 0..w {
            let mut acc = 0f64;
            for (k, &wt) in kernel.iter().enumerate() {
                let cc = (c as isize + k as isize - radius).clamp(0, w as isize - 1) as usize;
                acc += wt * row[cc];
            }
            tmp[r * w + c] = acc;
        }
    }

    // Vertical pass.
    let mut out = vec![0f64; w * h];
    for r in 0..h {
        for c in 0..w {
            let mut acc = 0f64;
            for (k, &wt) in kernel.iter().enumerate() {
                let rr = (r as isize + k as isize - radius).clamp(0, h as isize - 1) as usize;
                acc += wt * tmp[rr * w + c];
            }
            out[r * w + c] = acc;
        }
    }

    Raster::from_vec(w, h, out)
}

/// Stage 1: convert to L*a*b* and smooth each channel independently.
pub fn normalize_color(image: &SkyImage, sigma: f64) -> ColorField {
    let lab = rgb_to_lab(image);
    ColorField {
        lightness: gaussian_blur(&lab.lightness, sigma),
        chroma_a: gaussian_blur(&lab.chroma_a, sigma),
        chroma_b: gaussian_blur(&lab.chroma_b, sigma),
    }
}
