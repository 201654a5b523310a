//! Batch cloud coverage over a directory of sky photographs.
//! Every image is segmented independently (in parallel); per-image failures
//! are logged and collected, they never stop the batch.
//! Output: one JSON file with a report per image plus the failures.

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use skycover_core::{CloudSegmenter, SegmentationConfig, SegmentationSummary, SkyImage};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// File extensions picked up from the input directory (lower-case).
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "batch", about = "Estimate cloud coverage for every image in a directory")]
struct Args {
    /// Directory containing sky images.
    #[arg(short, long)]
    input_dir: PathBuf,

    /// Output JSON summary.
    #[arg(short, long, default_value = "data/coverage.json")]
    output: PathBuf,

    /// JSON segmentation config (defaults when omitted).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: String,
}

// ── Output types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ImageReport {
    image: String,
    #[serde(flatten)]
    summary: SegmentationSummary,
}

#[derive(Serialize)]
struct Failure {
    image: String,
    error: String,
}

#[derive(Serialize)]
struct BatchSummary {
    processed: usize,
    failed: usize,
    mean_coverage: Option<f64>,
    reports: Vec<ImageReport>,
    failures: Vec<Failure>,
}

// ── Discovery / processing ────────────────────────────────────────────────────

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn discover_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && is_image(&path) {
            paths.push(path);
        }
    }
    // Stable output order regardless of directory iteration order.
    paths.sort();
    Ok(paths)
}

fn process(segmenter: &CloudSegmenter, path: &Path) -> Result<ImageReport> {
    let decoded = image::open(path).with_context(|| format!("decoding {}", path.display()))?;
    let sky = SkyImage::from_dynamic(decoded)?;
    let seg = segmenter.segment(&sky)?;
    Ok(ImageReport {
        image: path.display().to_string(),
        summary: seg.summary(),
    })
}

fn summarise(results: Vec<(PathBuf, Result<ImageReport>)>) -> BatchSummary {
    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for (path, res) in results {
        match res {
            Ok(r) => reports.push(r),
            Err(e) => {
                warn!("{}: {:#}", path.display(), e);
                failures.push(Failure {
                    image: path.display().to_string(),
                    error: format!("{e:#}"),
                });
            }
        }
    }
    let mean_coverage = if reports.is_empty() {
        None
    } else {
        Some(reports.iter().map(|r| r.summary.coverage).sum::<f64>() / reports.len() as f64)
    };
    BatchSummary {
        processed: reports.len(),
        failed: failures.len(),
        mean_coverage,
        reports,
        failures,
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    let _logger = flexi_logger::Logger::try_with_str(&args.log_level)
        .context("invalid --log-level")?
        .log_to_stderr()
        .start()
        .context("starting logger")?;

    let config = match &args.config {
        Some(path) => SegmentationConfig::from_json_file(path)?,
        None => SegmentationConfig::default(),
    };
    let segmenter = CloudSegmenter::new(config)?;

    let images = discover_images(&args.input_dir)?;
    info!("Processing {} images from {} ...", images.len(), args.input_dir.display());

    let results: Vec<(PathBuf, Result<ImageReport>)> = images
        .par_iter()
        .map(|p| (p.clone(), process(&segmenter, p)))
        .collect();
    let summary = summarise(results);

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&args.output, serde_json::to_string_pretty(&summary)?)
        .with_context(|| format!("writing {}", args.output.display()))?;

    match summary.mean_coverage {
        Some(mean) => info!(
            "{} images processed, {} failed, mean coverage {:.2}%",
            summary.processed,
            summary.failed,
            mean * 100.0
        ),
        None => warn!("no images processed ({} failed)", summary.failed),
    }
    info!("Wrote {}", args.output.display());
    Ok(())
}
