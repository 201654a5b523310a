//! Per-pixel feature construction: smoothed L*a*b*, normalised position and
//! the image-wide texture descriptors.
use serde::{Deserialize, Serialize};

use crate::color::ColorField;
use crate::texture::TextureDescriptors;

/// Number of scalar dimensions in a flattened FeatureVector.
pub const FEATURE_DIMS: usize = 11;

/// One pixel's features. Flattened order is
/// `[lightness, chroma_a, chroma_b, x, y, contrast, dissimilarity,
/// homogeneity, energy, correlation, asm]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    pub lightness: f64,
    pub chroma_a: f64,
    pub chroma_b: f64,
    /// Column / width, in [0, 1).
    pub x: f64,
    /// Row / height, in [0, 1).
    pub y: f64,
    pub texture: TextureDescriptors,
}

impl FeatureVector {
    pub fn to_array(&self) -> [f64; FEATURE_DIMS] {
        let t = self.texture.to_array();
        [
            self.lightness,
            self.chroma_a,
            self.chroma_b,
            self.x,
            self.y,
            t[0],
            t[1],
            t[2],
            t[3],
            t[4],
            t[5],
        ]
    }

    pub fn from_array(v: &[f64; FEATURE_DIMS]) -> Self {
        Self {
            lightness: v[0],
            chroma_a: v[1],
            chroma_b: v[2],
            x: v[3],
            y: v[4],
            texture: TextureDescriptors {
                contrast: v[5],
                dissimilarity: v[6],
                homogeneity: v[7],
                energy: v[8],
                correlation: v[9],
                asm: v[10],
            },
        }
    }
}

/// Feature vectors for every pixel, row-major.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub width: usize,
    pub height: usize,
    pub vectors: Vec<FeatureVector>,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Flattened copy suitable for the clusterer.
    pub fn to_matrix(&self) -> Vec<[f64; FEATURE_DIMS]> {
        self.vectors.iter().map(FeatureVector::to_array).collect()
    }
}

/// Stage 2: concatenate colour, position and texture per pixel.
pub fn build_features(color: &ColorField, texture: TextureDescriptors) -> FeatureSet {
    let (w, h) = (color.width(), color.height());
    let mut vectors = Vec::with_capacity(w * h);
    for r in 0..h {
        for c in 0..w {
            vectors.push(FeatureVector {
                lightness: *color.lightness.get(r, c),
                chroma_a: *color.chroma_a.get(r, c),
                chroma_b: *color.chroma_b.get(r, c),
                x: c as f64 / w as f64,
                y: r as f64 / h as f64,
                texture,
            });
        }
    }
    FeatureSet { width: w, height: h, vectors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Raster;

    fn field(w: usize, h: usize) -> ColorField {
        ColorField {
            lightness: Raster::from_vec(w, h, (0..w * h).map(|i| i as f64).collect()),
            chroma_a: Raster::new(w, h, -3.0),
            chroma_b: Raster::new(w, h, 4.0),
        }
    }

    #[test]
    fn layout_and_positions() {
        let texture = TextureDescriptors { contrast: 2.0, correlation: 0.5, ..Default::default() };
        let set = build_features(&field(4, 2), texture);
        assert_eq!(set.len(), 8);

        let v = set.vectors[6]; // row 1, col 2
        assert_eq!(v.lightness, 6.0);
        assert_eq!(v.x, 0.5);
        assert_eq!(v.y, 0.5);

        let flat = v.to_array();
        assert_eq!(flat[0], 6.0);
        assert_eq!(flat[1], -3.0);
        assert_eq!(flat[2], 4.0);
        assert_eq!(flat[3], 0.5);
        assert_eq!(flat[4], 0.5);
        assert_eq!(flat[5], 2.0);
        assert_eq!(flat[9], 0.5);
    }

    #[test]
    fn positions_stay_below_one() {
        let set = build_features(&field(3, 5), TextureDescriptors::default());
        assert!(set.vectors.iter().all(|v| (0.0..1.0).contains(&v.x) && (0.0..1.0).contains(&v.y)));
    }

    #[test]
    fn texture_is_identical_for_every_pixel() {
        let texture = TextureDescriptors { energy: 0.7, ..Default::default() };
        let set = build_features(&field(3, 3), texture);
        assert!(set.vectors.iter().all(|v| v.texture == texture));
    }

    #[test]
    fn array_round_trip_preserves_fields() {
        let v = FeatureVector {
            lightness: 1.0,
            chroma_a: 2.0,
            chroma_b: 3.0,
            x: 0.25,
            y: 0.75,
            texture: TextureDescriptors { asm: 9.0, ..Default::default() },
        };
        assert_eq!(FeatureVector::from_array(&v.to_array()), v);
    }
}
