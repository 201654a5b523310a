//! Tunable parameters for one segmentation run.
//!
//! Every field has a default, so a JSON file only needs the values it
//! overrides:
//!
//! ```json
//! { "clusters": 4, "min_object_size": 200, "connectivity": "eight" }
//! ```
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cluster::KMeansParams;
use crate::error::{Result, SegmentError};
use crate::labeler::SemanticLabeler;
use crate::mask::Connectivity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SegmentationConfig {
    /// Number of k-means clusters (k ≥ 2).
    pub clusters: usize,
    pub seed: u64,
    pub max_iterations: usize,
    /// Summed squared centroid shift at which k-means stops early.
    pub tolerance: f64,
    /// Independent k-means++ seedings; the lowest-inertia one is kept.
    pub restarts: usize,
    /// Gaussian σ in pixels for the L*a*b* smoothing; 0 disables it.
    pub blur_sigma: f64,
    /// GLCM pixel offset.
    pub glcm_distance: usize,
    /// GLCM direction in radians; 0 pairs each pixel with its right neighbour.
    pub glcm_angle: f64,
    /// Cloud components below this many pixels are treated as noise.
    pub min_object_size: usize,
    pub connectivity: Connectivity,
    pub labeler: SemanticLabeler,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        let km = KMeansParams::default();
        Self {
            clusters: km.clusters,
            seed: km.seed,
            max_iterations: km.max_iterations,
            tolerance: km.tolerance,
            restarts: km.restarts,
            blur_sigma: 1.0,
            glcm_distance: 5,
            glcm_angle: 0.0,
            min_object_size: 500,
            connectivity: Connectivity::Four,
            labeler: SemanticLabeler::default(),
        }
    }
}

impl SegmentationConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SegmentError::config("parsing config JSON", e))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| SegmentError::config(format!("reading {}", path.display()), e))?;
        serde_json::from_str(&text)
            .map_err(|e| SegmentError::config(format!("parsing {}", path.display()), e))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| SegmentError::config("serialising config", e))
    }

    pub fn kmeans(&self) -> KMeansParams {
        KMeansParams {
            clusters: self.clusters,
            seed: self.seed,
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            restarts: self.restarts,
        }
    }

    /// Reject values outside their valid ranges.
    pub fn validate(&self) -> Result<()> {
        if self.clusters < 2 {
            return Err(SegmentError::invalid_parameter("clusters", self.clusters));
        }
        if self.max_iterations == 0 {
            return Err(SegmentError::invalid_parameter("max_iterations", self.max_iterations));
        }
        if self.restarts == 0 {
            return Err(SegmentError::invalid_parameter("restarts", self.restarts));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(SegmentError::invalid_parameter("tolerance", self.tolerance));
        }
        if !self.blur_sigma.is_finite() || self.blur_sigma < 0.0 {
            return Err(SegmentError::invalid_parameter("blur_sigma", self.blur_sigma));
        }
        if self.glcm_distance == 0 {
            return Err(SegmentError::invalid_parameter("glcm_distance", self.glcm_distance));
        }
        if !self.glcm_angle.is_finite() {
            return Err(SegmentError::invalid_parameter("glcm_angle", self.glcm_angle));
        }
        Ok(())
    }
}
