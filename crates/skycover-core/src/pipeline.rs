//! Pipeline orchestrator: runs the five segmentation stages in order.
//!
//!   1. colour normalisation   (sRGB → L*a*b*, Gaussian smoothing)
//!   2. feature construction   (L*a*b* + position + global GLCM texture)
//!   3. k-means clustering
//!   4. sky / ground role assignment
//!   5. small-component removal and coverage
//!
//! Each stage only reads the previous stage's output.
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::cluster::{cluster_pixels, ClusterAssignment};
use crate::color::normalize_color;
use crate::config::SegmentationConfig;
use crate::error::Result;
use crate::features::build_features;
use crate::labeler::SemanticRoles;
use crate::mask::{refine, CloudMask, CoverageReport};
use crate::sky_image::SkyImage;
use crate::texture::{compute_texture, TextureDescriptors};

/// Everything produced by one run.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub texture: TextureDescriptors,
    pub clusters: ClusterAssignment,
    pub roles: SemanticRoles,
    pub cloud_mask: CloudMask,
    pub report: CoverageReport,
}

impl Segmentation {
    pub fn coverage(&self) -> f64 {
        self.report.coverage
    }

    pub fn coverage_percent(&self) -> f64 {
        self.report.coverage_percent()
    }

    pub fn summary(&self) -> SegmentationSummary {
        SegmentationSummary {
            width: self.cloud_mask.width,
            height: self.cloud_mask.height,
            coverage: self.report.coverage,
            coverage_percent: self.report.coverage_percent(),
            cloud_pixels: self.report.cloud_pixels,
            sky_and_cloud_pixels: self.report.sky_and_cloud_pixels,
            ground_pixels: self.report.ground_pixels,
            sky_label: self.roles.sky,
            ground_label: self.roles.ground,
            iterations: self.clusters.iterations,
            converged: self.clusters.converged,
        }
    }
}

/// Serialisable headline numbers for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationSummary {
    pub width: usize,
    pub height: usize,
    pub coverage: f64,
    pub coverage_percent: f64,
    pub cloud_pixels: usize,
    pub sky_and_cloud_pixels: usize,
    pub ground_pixels: usize,
    pub sky_label: usize,
    pub ground_label: usize,
    pub iterations: usize,
    pub converged: bool,
}

pub struct CloudSegmenter {
    config: SegmentationConfig,
}

impl CloudSegmenter {
    /// Validates the config up front so `segment` only fails on bad input.
    pub fn new(config: SegmentationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    pub fn segment(&self, image: &SkyImage) -> Result<Segmentation> {
        let cfg = &self.config;
        debug!("segmenting {}x{} image", image.width(), image.height());

        // ── 1. Colour ───────────────────────────────────────────────────────
        let color = normalize_color(image, cfg.blur_sigma);
        debug!(
            "lightness range {:.2}..{:.2}",
            color.lightness.min_value(),
            color.lightness.max_value()
        );

        // ── 2. Features ─────────────────────────────────────────────────────
        let texture = compute_texture(image, cfg.glcm_distance, cfg.glcm_angle);
        debug!("texture descriptors {:?}", texture);
        let features = build_features(&color, texture);

        // ── 3. Clustering ───────────────────────────────────────────────────
        let clusters = cluster_pixels(&features, &cfg.kmeans())?;
        debug!(
            "k-means: k={} inertia {:.3} after {} iterations, sizes {:?}",
            clusters.k(),
            clusters.inertia,
            clusters.iterations,
            clusters.cluster_sizes()
        );

        // ── 4. Roles ────────────────────────────────────────────────────────
        let roles = cfg.labeler.assign(&clusters.centroids)?;
        debug!("sky label {}, ground label {}", roles.sky, roles.ground);

        // ── 5. Mask + coverage ──────────────────────────────────────────────
        let (cloud_mask, report) =
            refine(&clusters.labels, &roles, cfg.min_object_size, cfg.connectivity);
        info!(
            "cloud coverage {:.2}% ({} of {} sky-dome pixels, {} small components removed)",
            report.coverage_percent(),
            report.cloud_pixels,
            report.sky_and_cloud_pixels,
            report.components_removed
        );

        Ok(Segmentation { texture, clusters, roles, cloud_mask, report })
    }
}

/// One-shot convenience wrapper.
pub fn segment_image(image: &SkyImage, config: &SegmentationConfig) -> Result<Segmentation> {
    CloudSegmenter::new(config.clone())?.segment(image)
}

// ── Unit tests ────────────────────────────────────────────────────────────────
