//! Cloud coverage estimation for ground-based sky photographs.
//!
//! The pipeline segments one RGB image into sky, cloud and ground and
//! reports the fraction of the sky dome covered by cloud:
//!
//! ```no_run
//! use skycover_core::{segment_image, SegmentationConfig, SkyImage};
//!
//! let decoded = image::open("sky.jpg").unwrap();
//! let sky = SkyImage::from_dynamic(decoded)?;
//! let seg = segment_image(&sky, &SegmentationConfig::default())?;
//! println!("cloud cover: {:.1}%", seg.coverage_percent());
//! # Ok::<(), skycover_core::SegmentError>(())
//! ```

pub mod cluster;
pub mod color;
pub mod config;
pub mod error;
pub mod export;
pub mod features;
pub mod labeler;
pub mod mask;
pub mod pipeline;
pub mod raster;
pub mod sky_image;
pub mod texture;

pub use cluster::{cluster_pixels, ClusterAssignment, KMeansParams};
pub use config::SegmentationConfig;
pub use error::{Result, SegmentError};
pub use features::{FeatureSet, FeatureVector};
pub use labeler::{SemanticLabeler, SemanticRoles};
pub use mask::{CloudMask, Connectivity, CoverageReport};
pub use pipeline::{segment_image, CloudSegmenter, Segmentation, SegmentationSummary};
pub use raster::Raster;
pub use sky_image::SkyImage;
pub use texture::TextureDescriptors;
