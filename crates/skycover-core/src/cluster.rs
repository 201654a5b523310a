//! Seeded k-means over per-pixel feature vectors.
//!
//! Lloyd iterations with greedy k-means++ seeding. No feature scaling is
//! applied, so the large-magnitude L*a*b* channels and the [0,1) position
//! channels dominate; the constant texture block only offsets every vector
//! equally. Several independent seedings are drawn from one `StdRng` and the
//! lowest-inertia run is kept.
//!
//! With the `threading` feature the per-point nearest-centroid search runs on
//! rayon. Every reduction (changed-label count, centroid sums, inertia) stays
//! sequential in point order, so results are bit-identical either way.
use std::collections::HashSet;

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "threading")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentError};
use crate::features::{FeatureSet, FeatureVector, FEATURE_DIMS};
use crate::raster::Raster;

type Point = [f64; FEATURE_DIMS];

/// Clustering parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KMeansParams {
    pub clusters: usize,
    pub seed: u64,
    pub max_iterations: usize,
    /// Stop once the summed squared centroid shift of one iteration is at or below this.
    pub tolerance: f64,
    /// Independent seedings; the lowest-inertia run wins.
    pub restarts: usize,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            clusters: 5,
            seed: 42,
            max_iterations: 300,
            tolerance: 1e-4,
            restarts: 10,
        }
    }
}

/// Result of clustering one image.
#[derive(Debug, Clone)]
pub struct ClusterAssignment {
    /// Cluster label per pixel, in `0..centroids.len()`.
    pub labels: Raster<usize>,
    pub centroids: Vec<FeatureVector>,
    /// Lloyd iterations used by the winning run.
    pub iterations: usize,
    /// Sum of squared distances from each pixel to its centroid.
    pub inertia: f64,
    pub converged: bool,
}

impl ClusterAssignment {
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Pixel count per label.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.k()];
        for &l in &self.labels.data {
            sizes[l] += 1;
        }
        sizes
    }
}

struct Run {
    labels: Vec<usize>,
    centroids: Vec<Point>,
    iterations: usize,
    inertia: f64,
    converged: bool,
}

#[inline]
fn sq_dist(a: &Point, b: &Point) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[inline]
fn nearest(p: &Point, centroids: &[Point]) -> (usize, f64) {
    let mut best = (0usize, f64::INFINITY);
    for (j, c) in centroids.iter().enumerate() {
        let d = sq_dist(p, c);
        if d < best.1 {
            best = (j, d);
        }
    }
    best
}

fn nearest_all(points: &[Point], centroids: &[Point]) -> Vec<(usize, f64)> {
    #[cfg(feature = "threading")]
    {
        points.par_iter().map(|p| nearest(p, centroids)).collect()
    }
    #[cfg(not(feature = "threading"))]
    {
        points.iter().map(|p| nearest(p, centroids)).collect()
    }
}

/// Count distinct vectors, stopping early once `limit` is reached.
/// `-0.0` and `0.0` count as the same value.
fn count_distinct(points: &[Point], limit: usize) -> usize {
    let mut seen: HashSet<[u64; FEATURE_DIMS]> = HashSet::new();
    for p in points {
        let mut key = [0u64; FEATURE_DIMS];
        for (k, v) in key.iter_mut().zip(p.iter()) {
            *k = (v + 0.0).to_bits();
        }
        seen.insert(key);
        if seen.len() >= limit {
            break;
        }
    }
    seen.len()
}

/// Draw an index with probability proportional to `weights[i]`.
fn sample_weighted(weights: &[f64], total: f64, rng: &mut StdRng) -> usize {
    let target = rng.gen::<f64>() * total;
    let mut acc = 0f64;
    for (i, &w) in weights.iter().enumerate() {
        acc += w;
        if acc > target {
            return i;
        }
    }
    // Rounding can leave target just above the running sum; fall back to the
    // last index with non-zero weight.
    weights.iter().rposition(|&w| w > 0.0).unwrap_or(weights.len() - 1)
}

/// Greedy k-means++: each new centre is the best of `2 + ln k` D²-weighted draws.
fn seed_centroids(points: &[Point], k: usize, rng: &mut StdRng) -> Vec<Point> {
    let n = points.len();
    let trials = 2 + (k as f64).ln() as usize;

    let mut centroids = Vec::with_capacity(k);
    let first = points[rng.gen_range(0..n)];
    centroids.push(first);
    let mut closest: Vec<f64> = points.iter().map(|p| sq_dist(p, &first)).collect();

    while centroids.len() < k {
        let total: f64 = closest.iter().sum();
        let mut best: Option<(f64, usize, Vec<f64>)> = None;

        for _ in 0..trials {
            let cand = if total > 0.0 {
                sample_weighted(&closest, total, rng)
            } else {
                // Every point coincides with a centre; take any point not yet chosen.
                points
                    .iter()
                    .position(|p| centroids.iter().all(|c| c != p))
                    .unwrap_or(0)
            };
            let updated: Vec<f64> = points
                .iter()
                .zip(closest.iter())
                .map(|(p, &d)| d.min(sq_dist(p, &points[cand])))
                .collect();
            let potential: f64 = updated.iter().sum();
            if best.as_ref().map_or(true, |(bp, _, _)| potential < *bp) {
                best = Some((potential, cand, updated));
            }
        }

        if let Some((_, idx, updated)) = best {
            centroids.push(points[idx]);
            closest = updated;
        }
    }
    centroids
}

/// Means of assigned points; empty clusters take the point farthest from its
/// own centroid (which is moved to the empty cluster).
fn update_centroids(points: &[Point], labels: &mut [usize], dists: &mut [f64], k: usize) -> Vec<Point> {
    let mut counts = vec![0usize; k];
    for &l in labels.iter() {
        counts[l] += 1;
    }

    for j in 0..k {
        if counts[j] > 0 {
            continue;
        }
        let mut far: Option<(usize, f64)> = None;
        for (i, &d) in dists.iter().enumerate() {
            if counts[labels[i]] > 1 && far.map_or(true, |(_, fd)| d > fd) {
                far = Some((i, d));
            }
        }
        if let Some((i, _)) = far {
            counts[labels[i]] -= 1;
            labels[i] = j;
            dists[i] = 0.0;
            counts[j] = 1;
        }
    }

    let mut sums = vec![[0f64; FEATURE_DIMS]; k];
    for (p, &l) in points.iter().zip(labels.iter()) {
        for (s, v) in sums[l].iter_mut().zip(p.iter()) {
            *s += v;
        }
    }
    sums.iter()
        .zip(counts.iter())
        .map(|(s, &n)| {
            let mut c = *s;
            if n > 0 {
                for v in &mut c {
                    *v /= n as f64;
                }
            }
            c
        })
        .collect()
}

fn lloyd(points: &[Point], mut centroids: Vec<Point>, max_iterations: usize, tolerance: f64) -> Run {
    let k = centroids.len();
    let n = points.len();
    let mut labels = vec![usize::MAX; n];
    let mut dists = vec![0f64; n];
    let mut converged = false;
    let mut iterations = 0;

    for it in 1..=max_iterations {
        iterations = it;
        let mut changed = 0usize;
        for (i, (l, d)) in nearest_all(points, &centroids).into_iter().enumerate() {
            if labels[i] != l {
                changed += 1;
                labels[i] = l;
            }
            dists[i] = d;
        }
        if changed == 0 {
            converged = true;
            break;
        }

        let next = update_centroids(points, &mut labels, &mut dists, k);
        let shift: f64 = centroids.iter().zip(next.iter()).map(|(a, b)| sq_dist(a, b)).sum();
        centroids = next;
        if shift <= tolerance {
            converged = true;
            break;
        }
    }

    // Labels must refer to the final centroids.
    let final_assign = nearest_all(points, &centroids);
    let inertia = final_assign.iter().map(|&(_, d)| d).sum();
    let labels = final_assign.into_iter().map(|(l, _)| l).collect();

    Run { labels, centroids, iterations, inertia, converged }
}

/// Stage 3: partition feature vectors into `params.clusters` groups.
pub fn cluster_pixels(features: &FeatureSet, params: &KMeansParams) -> Result<ClusterAssignment> {
    let k = params.clusters;
    if k == 0 {
        return Err(SegmentError::clustering("cluster count must be at least 1"));
    }
    if features.is_empty() {
        return Err(SegmentError::clustering("no samples to cluster"));
    }
    if params.max_iterations == 0 {
        return Err(SegmentError::invalid_parameter("max_iterations", 0));
    }
    if params.restarts == 0 {
        return Err(SegmentError::invalid_parameter("restarts", 0));
    }

    let points = features.to_matrix();
    let distinct = count_distinct(&points, k);
    if distinct < k {
        return Err(SegmentError::clustering(format!(
            "{k} clusters requested but only {distinct} distinct feature vectors"
        )));
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut best: Option<Run> = None;
    for restart in 0..params.restarts {
        let init = seed_centroids(&points, k, &mut rng);
        let run = lloyd(&points, init, params.max_iterations, params.tolerance);
        debug!(
            "k-means restart {restart}: inertia {:.3}, {} iterations, converged={}",
            run.inertia, run.iterations, run.converged
        );
        if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
            best = Some(run);
        }
    }

    let run = best.ok_or_else(|| SegmentError::clustering("no clustering run completed"))?;
    if !run.converged {
        warn!(
            "k-means did not converge within {} iterations; using last assignment",
            params.max_iterations
        );
    }

    Ok(ClusterAssignment {
        labels: Raster::from_vec(features.width, features.height, run.labels),
        centroids: run.centroids.iter().map(FeatureVector::from_array).collect(),
        iterations: run.iterations,
        inertia: run.inertia,
        converged: run.converged,
    })
}
