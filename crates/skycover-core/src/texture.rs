//! Global texture descriptors from a gray-level co-occurrence matrix.
//!
//! One GLCM is built for the whole image at a single (distance, angle)
//! offset, accumulated symmetrically and normalised to unit sum. Six Haralick
//! style properties are read off it:
//!
//!   contrast      = Σ P(i,j)·(i−j)²
//!   dissimilarity = Σ P(i,j)·|i−j|
//!   homogeneity   = Σ P(i,j) / (1 + (i−j)²)
//!   ASM           = Σ P(i,j)²
//!   energy        = √ASM
//!   correlation   = Σ P(i,j)·(i−μi)(j−μj) / (σi·σj)
//!
//! Correlation is defined as 1 when either marginal has (near) zero variance.
use serde::{Deserialize, Serialize};

use crate::raster::Raster;
use crate::sky_image::SkyImage;

/// Number of gray levels (8-bit quantisation).
pub const LEVELS: usize = 256;

/// Luma weights applied to [0,1] RGB before quantisation.
const LUMA_R: f64 = 0.2125;
const LUMA_G: f64 = 0.7154;
const LUMA_B: f64 = 0.0721;

/// Variance floor below which correlation is reported as 1.
const CORRELATION_EPS: f64 = 1e-15;

/// The six whole-image texture properties.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TextureDescriptors {
    pub contrast: f64,
    pub dissimilarity: f64,
    pub homogeneity: f64,
    pub energy: f64,
    pub correlation: f64,
    pub asm: f64,
}

impl TextureDescriptors {
    /// Descriptors in feature order.
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.contrast,
            self.dissimilarity,
            self.homogeneity,
            self.energy,
            self.correlation,
            self.asm,
        ]
    }
}

/// Normalised symmetric co-occurrence matrix, `LEVELS × LEVELS`, row-major.
#[derive(Debug, Clone)]
pub struct Glcm {
    pub probabilities: Vec<f64>,
    /// Number of ordered pixel pairs counted before symmetrisation.
    pub pairs: u64,
}

impl Glcm {
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.probabilities[i * LEVELS + j]
    }
}

/// 8-bit grayscale levels: luma on [0,1] channels, scaled by 255, truncated.
pub fn grayscale_levels(image: &SkyImage) -> Raster<u8> {
    let data = image
        .as_rgb()
        .pixels()
        .map(|px| {
            let [r, g, b] = px.0;
            let y = LUMA_R * (r as f64 / 255.0)
                + LUMA_G * (g as f64 / 255.0)
                + LUMA_B * (b as f64 / 255.0);
            (y * 255.0).clamp(0.0, 255.0) as u8
        })
        .collect();
    Raster::from_vec(image.width(), image.height(), data)
}

/// Build the symmetric, unit-sum GLCM at one offset.
///
/// The offset is `(round(sin θ · d), round(cos θ · d))` in (row, col); angle 0
/// pairs each pixel with the one `distance` columns to its right. A matrix
/// with no valid pairs (image narrower than the offset) stays all-zero.
pub fn cooccurrence_matrix(gray: &Raster<u8>, distance: usize, angle_rad: f64) -> Glcm {
    let d = distance as f64;
    let dr = (angle_rad.sin() * d).round() as isize;
    let dc = (angle_rad.cos() * d).round() as isize;
    let (w, h) = (gray.width as isize, gray.height as isize);

    let mut counts = vec![0u64; LEVELS * LEVELS];
    let mut pairs = 0u64;
    for r in 0..h {
        let r2 = r + dr;
        if r2 < 0 || r2 >= h {
            continue;
        }
        for c in 0..w {
            let c2 = c + dc;
            if c2 < 0 || c2 >= w {
                continue;
            }
            let i = *gray.get(r as usize, c as usize) as usize;
            let j = *gray.get(r2 as usize, c2 as usize) as usize;
            counts[i * LEVELS + j] += 1;
            counts[j * LEVELS + i] += 1;
            pairs += 1;
        }
    }

    let total = (2 * pairs).max(1) as f64;
    Glcm {
        probabilities: counts.iter().map(|&n| n as f64 / total).collect(),
        pairs,
    }
}

/// Reduce a GLCM to its six descriptors.
pub fn texture_descriptors(glcm: &Glcm) -> TextureDescriptors {
    let mut contrast = 0f64;
    let mut dissimilarity = 0f64;
    let mut homogeneity = 0f64;
    let mut asm = 0f64;
    let mut mu_i = 0f64;
    let mut mu_j = 0f64;

    for i in 0..LEVELS {
        for j in 0..LEVELS {
            let p = glcm.get(i, j);
            if p == 0.0 {
                continue;
            }
            let diff = i as f64 - j as f64;
            contrast += p * diff * diff;
            dissimilarity += p * diff.abs();
            homogeneity += p / (1.0 + diff * diff);
            asm += p * p;
            mu_i += p * i as f64;
            mu_j += p * j as f64;
        }
    }

    let mut var_i = 0f64;
    let mut var_j = 0f64;
    let mut cov = 0f64;
    for i in 0..LEVELS {
        for j in 0..LEVELS {
            let p = glcm.get(i, j);
            if p == 0.0 {
                continue;
            }
            let di = i as f64 - mu_i;
            let dj = j as f64 - mu_j;
            var_i += p * di * di;
            var_j += p * dj * dj;
            cov += p * di * dj;
        }
    }
    let (std_i, std_j) = (var_i.sqrt(), var_j.sqrt());
    let correlation = if std_i < CORRELATION_EPS || std_j < CORRELATION_EPS {
        1.0
    } else {
        cov / (std_i * std_j)
    };

    TextureDescriptors {
        contrast,
        dissimilarity,
        homogeneity,
        energy: asm.sqrt(),
        correlation,
        asm,
    }
}

/// Grayscale → GLCM → descriptors in one call.
pub fn compute_texture(image: &SkyImage, distance: usize, angle_rad: f64) -> TextureDescriptors {
    let gray = grayscale_levels(image);
    let glcm = cooccurrence_matrix(&gray, distance, angle_rad);
    texture_descriptors(&glcm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn gray_from(w: usize, h: usize, data: Vec<u8>) -> Raster<u8> {
        Raster::from_vec(w, h, data)
    }

    #[test]
    fn uniform_image_has_degenerate_texture() {
        let g = gray_from(8, 4, vec![100; 32]);
        let glcm = cooccurrence_matrix(&g, 5, 0.0);
        assert_eq!(glcm.pairs, 3 * 4);
        assert_abs_diff_eq!(glcm.get(100, 100), 1.0, epsilon = 1e-12);

        let t = texture_descriptors(&glcm);
        assert_abs_diff_eq!(t.contrast, 0.0);
        assert_abs_diff_eq!(t.dissimilarity, 0.0);
        assert_abs_diff_eq!(t.homogeneity, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t.asm, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t.energy, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t.correlation, 1.0);
    }

    #[test]
    fn two_level_stripes() {
        // Columns alternate 0,1,0,1,... ; offset 1 always pairs 0↔1.
        let data = (0..4 * 6).map(|i| (i % 6 % 2) as u8).collect();
        let g = gray_from(6, 4, data);
        let glcm = cooccurrence_matrix(&g, 1, 0.0);
        assert_abs_diff_eq!(glcm.get(0, 1), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(glcm.get(1, 0), 0.5, epsilon = 1e-12);

        let t = texture_descriptors(&glcm);
        assert_abs_diff_eq!(t.contrast, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t.dissimilarity, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t.homogeneity, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(t.asm, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(t.correlation, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn matrix_is_symmetric_and_sums_to_one() {
        let data = (0..10 * 10).map(|i| ((i * 37) % 256) as u8).collect();
        let g = gray_from(10, 10, data);
        let glcm = cooccurrence_matrix(&g, 5, 0.0);
        let sum: f64 = glcm.probabilities.iter().sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-9);
        for i in (0..LEVELS).step_by(17) {
            for j in (0..LEVELS).step_by(13) {
                assert_eq!(glcm.get(i, j), glcm.get(j, i));
            }
        }
    }

    #[test]
    fn offset_wider_than_image_gives_zero_matrix() {
        let g = gray_from(3, 3, vec![7; 9]);
        let glcm = cooccurrence_matrix(&g, 5, 0.0);
        assert_eq!(glcm.pairs, 0);
        assert!(glcm.probabilities.iter().all(|&p| p == 0.0));
        let t = texture_descriptors(&glcm);
        assert_eq!(t.asm, 0.0);
        assert_eq!(t.correlation, 1.0);
    }

    #[test]
    fn vertical_angle_pairs_rows() {
        // Rows alternate 0 / 9; a vertical offset of 1 always pairs 0↔9.
        let data = (0..4 * 3).map(|i| if (i / 3) % 2 == 0 { 0 } else { 9 }).collect();
        let g = gray_from(3, 4, data);
        let glcm = cooccurrence_matrix(&g, 1, std::f64::consts::FRAC_PI_2);
        assert_eq!(glcm.pairs, 3 * 3);
        assert_abs_diff_eq!(glcm.get(0, 9), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn grayscale_black_and_gray() {
        let img = SkyImage::from_raw(2, 1, 3, vec![0, 0, 0, 128, 128, 128]).unwrap();
        let g = grayscale_levels(&img);
        assert_eq!(*g.get(0, 0), 0);
        // 0.2125+0.7154+0.0721 = 1.0, so a neutral gray maps to itself (±1 from truncation).
        assert!((*g.get(0, 1) as i32 - 128).abs() <= 1);
    }
}
