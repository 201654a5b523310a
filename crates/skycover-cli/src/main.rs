/// Single-image cloud coverage analysis.
/// Decodes one photo, runs the segmentation pipeline, prints a JSON report and
/// optionally writes the mask / segmentation / overlay PNGs.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use image::DynamicImage;
use log::info;
use serde::Serialize;
use skycover_core::export::{mask_image, overlay_image, segmentation_image};
use skycover_core::{segment_image, SegmentationConfig, SegmentationSummary, SkyImage};

#[derive(Parser, Debug)]
#[command(name = "skycover", about = "Estimate cloud coverage of a sky photograph")]
struct Args {
    /// Path to the JPEG/PNG sky image.
    #[arg(required_unless_present = "print_config")]
    image: Option<PathBuf>,

    /// JSON config file; flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of k-means clusters.
    #[arg(short = 'k', long)]
    clusters: Option<usize>,

    /// Seed for k-means initialisation.
    #[arg(long)]
    seed: Option<u64>,

    /// Minimum cloud component size in pixels.
    #[arg(long)]
    min_size: Option<usize>,

    /// Write the binary cloud mask (255 = cloud) to this PNG.
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Write the colour-coded cluster map to this PNG.
    #[arg(long)]
    segmentation: Option<PathBuf>,

    /// Write the photo with cloud pixels tinted to this PNG.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Write the JSON report here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the effective config as JSON and exit.
    #[arg(long)]
    print_config: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Serialize)]
struct Report {
    image: String,
    #[serde(flatten)]
    summary: SegmentationSummary,
}

fn effective_config(args: &Args) -> Result<SegmentationConfig> {
    let mut cfg = match &args.config {
        Some(path) => SegmentationConfig::from_json_file(path)?,
        None => SegmentationConfig::default(),
    };
    if let Some(k) = args.clusters {
        cfg.clusters = k;
    }
    if let Some(seed) = args.seed {
        cfg.seed = seed;
    }
    if let Some(min_size) = args.min_size {
        cfg.min_object_size = min_size;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn save_png(img: DynamicImage, path: &Path) -> Result<()> {
    img.save(path).with_context(|| format!("writing {}", path.display()))?;
    info!("wrote {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _logger = flexi_logger::Logger::try_with_str(&args.log_level)
        .context("invalid --log-level")?
        .log_to_stderr()
        .start()
        .context("starting logger")?;

    let cfg = effective_config(&args)?;
    if args.print_config {
        println!("{}", cfg.to_json_pretty()?);
        return Ok(());
    }

    let Some(image_path) = &args.image else {
        bail!("no image given");
    };
    if !image_path.is_file() {
        bail!("{} is not a file", image_path.display());
    }
    let decoded = image::open(image_path)
        .with_context(|| format!("decoding {}", image_path.display()))?;
    let sky = SkyImage::from_dynamic(decoded)
        .with_context(|| format!("validating {}", image_path.display()))?;

    let seg = segment_image(&sky, &cfg)?;

    if let Some(path) = &args.mask {
        save_png(DynamicImage::ImageLuma8(mask_image(&seg.cloud_mask)), path)?;
    }
    if let Some(path) = &args.segmentation {
        save_png(DynamicImage::ImageRgb8(segmentation_image(&seg.clusters.labels)), path)?;
    }
    if let Some(path) = &args.overlay {
        save_png(DynamicImage::ImageRgb8(overlay_image(&sky, &seg.cloud_mask)), path)?;
    }

    let report = Report {
        image: image_path.display().to_string(),
        summary: seg.summary(),
    };
    let json = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }

    eprintln!("Cloud coverage: {:.2}%", seg.coverage_percent());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from(["skycover", "sky.jpg", "-k", "3", "--min-size", "10"]).unwrap();
        let cfg = effective_config(&args).unwrap();
        assert_eq!(cfg.clusters, 3);
        assert_eq!(cfg.min_object_size, 10);
        assert_eq!(cfg.seed, 42);
    }

    #[test]
    fn invalid_cluster_count_is_rejected() {
        let args = Args::try_parse_from(["skycover", "sky.jpg", "-k", "1"]).unwrap();
        assert!(effective_config(&args).is_err());
    }

    #[test]
    fn image_optional_only_with_print_config() {
        assert!(Args::try_parse_from(["skycover"]).is_err());
        assert!(Args::try_parse_from(["skycover", "--print-config"]).is_ok());
    }
}
