//! Diagnostic visualizer: writes one PNG per pipeline stage for a single photo.
//! Not part of the main pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use image::DynamicImage;
use log::info;
use skycover_core::color::{normalize_color, rgb_to_lab};
use skycover_core::export::{channel_image, mask_image, overlay_image, segmentation_image};
use skycover_core::{CloudSegmenter, Raster, SegmentationConfig, SkyImage};

#[derive(Parser, Debug)]
#[command(name = "visualize", about = "Write per-stage debug images for one sky photo")]
struct Args {
    /// Path to the sky image.
    image: PathBuf,

    /// Output directory.
    #[arg(short, long, default_value = "data/debug")]
    out_dir: PathBuf,

    /// JSON segmentation config (defaults when omitted).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn write(img: DynamicImage, out_dir: &Path, name: &str) -> Result<()> {
    let path = out_dir.join(name);
    img.save(&path).with_context(|| format!("failed to save {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    let _logger = flexi_logger::Logger::try_with_str("info")?.log_to_stderr().start()?;

    let config = match &args.config {
        Some(path) => SegmentationConfig::from_json_file(path)?,
        None => SegmentationConfig::default(),
    };
    let decoded = image::open(&args.image)
        .with_context(|| format!("decoding {}", args.image.display()))?;
    let sky = SkyImage::from_dynamic(decoded)?;

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("cannot create {}", args.out_dir.display()))?;

    // ── 1. Lightness before and after smoothing ─────────────────────────────
    let raw = rgb_to_lab(&sky);
    write(DynamicImage::ImageLuma8(channel_image(&raw.lightness)), &args.out_dir, "lightness_raw.png")?;
    let smoothed = normalize_color(&sky, config.blur_sigma);
    write(
        DynamicImage::ImageLuma8(channel_image(&smoothed.lightness)),
        &args.out_dir,
        "lightness_smoothed.png",
    )?;

    info!("Running segmentation ({}×{})…", sky.width(), sky.height());
    let seg = CloudSegmenter::new(config)?.segment(&sky)?;

    // ── 2. Cluster map ──────────────────────────────────────────────────────
    write(
        DynamicImage::ImageRgb8(segmentation_image(&seg.clusters.labels)),
        &args.out_dir,
        "clusters.png",
    )?;

    // ── 3. Candidate mask before and after small-component removal ──────────
    let labels = &seg.clusters.labels;
    let candidates: Raster<bool> = labels.map(|&l| seg.roles.is_cloud_candidate(l));
    write(DynamicImage::ImageLuma8(mask_image(&candidates)), &args.out_dir, "mask_candidates.png")?;
    write(DynamicImage::ImageLuma8(mask_image(&seg.cloud_mask)), &args.out_dir, "mask_refined.png")?;

    // ── 4. Overlay ──────────────────────────────────────────────────────────
    write(DynamicImage::ImageRgb8(overlay_image(&sky, &seg.cloud_mask)), &args.out_dir, "overlay.png")?;

    info!(
        "coverage {:.2}%, {} components removed",
        seg.coverage_percent(),
        seg.report.components_removed
    );
    Ok(())
}
