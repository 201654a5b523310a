//! Cloud mask refinement and coverage.
//!
//! Candidate cloud pixels are grouped into connected components (two-pass
//! union-find) and components smaller than `min_size` are cleared. Coverage
//! is the surviving cloud area over the sky dome, i.e. every pixel that is not
//! ground.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::labeler::SemanticRoles;
use crate::raster::Raster;

/// Neighbourhood rule for connected components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Edge neighbours only.
    #[default]
    Four,
    /// Edge and corner neighbours.
    Eight,
}

/// Connected components of a boolean mask.
#[derive(Debug, Clone)]
pub struct Components {
    /// 0 = background, 1..=count = component id.
    pub labels: Raster<u32>,
    /// Pixel count per component; index 0 is unused.
    pub sizes: Vec<usize>,
}

impl Components {
    pub fn count(&self) -> usize {
        self.sizes.len() - 1
    }
}

fn find(parent: &mut [u32], mut x: u32) -> u32 {
    while parent[x as usize] != x {
        parent[x as usize] = parent[parent[x as usize] as usize];
        x = parent[x as usize];
    }
    x
}

fn union(parent: &mut [u32], a: u32, b: u32) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra < rb {
        parent[rb as usize] = ra;
    } else if rb < ra {
        parent[ra as usize] = rb;
    }
}

/// Label connected true-regions of `mask`, numbering them in raster order.
pub fn label_components(mask: &Raster<bool>, connectivity: Connectivity) -> Components {
    let (w, h) = (mask.width, mask.height);
    let mut labels = vec![0u32; w * h];
    let mut parent: Vec<u32> = vec![0];

    // First pass: provisional labels, recording equivalences.
    for row in 0..h {
        for col in 0..w {
            let idx = row * w + col;
            if !mask.data[idx] {
                continue;
            }

            let mut neighbours = [0u32; 4];
            let mut n = 0;
            let mut push = |l: u32| {
                if l > 0 {
                    neighbours[n] = l;
                    n += 1;
                }
            };
            if col > 0 {
                push(labels[idx - 1]);
            }
            if row > 0 {
                push(labels[idx - w]);
            }
            if connectivity == Connectivity::Eight && row > 0 {
                if col > 0 {
                    push(labels[idx - w - 1]);
                }
                if col + 1 < w {
                    push(labels[idx - w + 1]);
                }
            }

            if n == 0 {
                let next = parent.len() as u32;
                parent.push(next);
                labels[idx] = next;
            } else {
                let min = neighbours[..n].iter().copied().min().unwrap_or(0);
                labels[idx] = min;
                for &l in &neighbours[..n] {
                    union(&mut parent, min, l);
                }
            }
        }
    }

    // Second pass: collapse to sequential ids.
    let mut remap: HashMap<u32, u32> = HashMap::new();
    let mut sizes = vec![0usize];
    for l in labels.iter_mut() {
        if *l == 0 {
            continue;
        }
        let root = find(&mut parent, *l);
        let id = *remap.entry(root).or_insert_with(|| {
            sizes.push(0);
            (sizes.len() - 1) as u32
        });
        sizes[id as usize] += 1;
        *l = id;
    }

    Components { labels: Raster::from_vec(w, h, labels), sizes }
}

/// Clear every component with fewer than `min_size` pixels.
pub fn remove_small_components(mask: &Raster<bool>, min_size: usize, connectivity: Connectivity) -> Raster<bool> {
    if min_size <= 1 {
        return mask.clone();
    }
    let comps = label_components(mask, connectivity);
    comps.labels.map(|&id| id != 0 && comps.sizes[id as usize] >= min_size)
}

/// Pixel counts and the coverage ratio for one image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub cloud_pixels: usize,
    /// Pixels that are not ground (sky + cloud).
    pub sky_and_cloud_pixels: usize,
    pub ground_pixels: usize,
    /// Candidate cloud pixels before the size filter.
    pub candidate_pixels: usize,
    pub components_removed: usize,
    /// In [0, 1]; 0 when there is no sky dome.
    pub coverage: f64,
}

impl CoverageReport {
    pub fn coverage_percent(&self) -> f64 {
        self.coverage * 100.0
    }
}

/// Final boolean cloud mask.
pub type CloudMask = Raster<bool>;

/// Stage 5: candidate mask → size filter → coverage.
pub fn refine(
    labels: &Raster<usize>,
    roles: &SemanticRoles,
    min_size: usize,
    connectivity: Connectivity,
) -> (CloudMask, CoverageReport) {
    let sky_and_cloud = labels.map(|&l| l != roles.ground);
    let candidates = labels.map(|&l| roles.is_cloud_candidate(l));

    let comps = label_components(&candidates, connectivity);
    let components_removed = comps.sizes[1..].iter().filter(|&&s| s < min_size).count();
    let cloud = comps.labels.map(|&id| id != 0 && comps.sizes[id as usize] >= min_size);

    let cloud_pixels = cloud.count();
    let sky_and_cloud_pixels = sky_and_cloud.count();
    let coverage = if sky_and_cloud_pixels == 0 {
        0.0
    } else {
        cloud_pixels as f64 / sky_and_cloud_pixels as f64
    };

    let report = CoverageReport {
        cloud_pixels,
        sky_and_cloud_pixels,
        ground_pixels: labels.len() - sky_and_cloud_pixels,
        candidate_pixels: candidates.count(),
        components_removed,
        coverage,
    };
    (cloud, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from(rows: &[&str]) -> Raster<bool> {
        let h = rows.len();
        let w = rows[0].len();
        let data = rows.iter().flat_map(|r| r.chars().map(|c| c == '#')).collect();
        Raster::from_vec(w, h, data)
    }

    #[test]
    fn four_vs_eight_connectivity() {
        let m = mask_from(&[
            "#..",
            ".#.",
            "..#",
        ]);
        assert_eq!(label_components(&m, Connectivity::Four).count(), 3);
        assert_eq!(label_components(&m, Connectivity::Eight).count(), 1);
    }

    #[test]
    fn u_shape_merges_into_one_component() {
        let m = mask_from(&[
            "#.#",
            "#.#",
            "###",
        ]);
        let comps = label_components(&m, Connectivity::Four);
        assert_eq!(comps.count(), 1);
        assert_eq!(comps.sizes[1], 7);
    }

    #[test]
    fn removes_only_small_components() {
        let m = mask_from(&[
            "##...",
            "##..#",
            ".....",
        ]);
        let out = remove_small_components(&m, 2, Connectivity::Four);
        assert_eq!(out.count(), 4);
        assert!(!*out.get(1, 4));
    }

    #[test]
    fn removal_is_idempotent() {
        let m = mask_from(&[
            "##..#.",
            "#...##",
            "..#...",
        ]);
        let once = remove_small_components(&m, 3, Connectivity::Four);
        let twice = remove_small_components(&once, 3, Connectivity::Four);
        assert_eq!(once, twice);
    }

    #[test]
    fn larger_threshold_never_adds_pixels() {
        let m = mask_from(&[
            "##..#.#",
            "#...##.",
            "..#..##",
            "####...",
        ]);
        let mut prev = m.count();
        for min_size in 0..10 {
            let n = remove_small_components(&m, min_size, Connectivity::Four).count();
            assert!(n <= prev, "min_size {min_size}: {n} > {prev}");
            prev = n;
        }
    }

    #[test]
    fn coverage_counts_sky_dome_only() {
        // labels: 0 = sky, 1 = ground, 2 = cloud
        let labels = Raster::from_vec(4, 2, vec![0, 2, 2, 0, 1, 1, 1, 1]);
        let roles = SemanticRoles { sky: 0, ground: 1 };
        let (cloud, report) = refine(&labels, &roles, 0, Connectivity::Four);
        assert_eq!(cloud.count(), 2);
        assert_eq!(report.sky_and_cloud_pixels, 4);
        assert_eq!(report.ground_pixels, 4);
        assert_eq!(report.coverage, 0.5);
        assert_eq!(report.coverage_percent(), 50.0);
    }

    #[test]
    fn all_ground_gives_zero_coverage() {
        let labels = Raster::new(3, 3, 1usize);
        let roles = SemanticRoles { sky: 0, ground: 1 };
        let (cloud, report) = refine(&labels, &roles, 500, Connectivity::Four);
        assert_eq!(cloud.count(), 0);
        assert_eq!(report.coverage, 0.0);
    }

    #[test]
    fn small_cloud_is_dropped_from_coverage() {
        let labels = Raster::from_vec(3, 1, vec![2, 0, 0]);
        let roles = SemanticRoles { sky: 0, ground: 1 };
        let (_, report) = refine(&labels, &roles, 2, Connectivity::Four);
        assert_eq!(report.candidate_pixels, 1);
        assert_eq!(report.components_removed, 1);
        assert_eq!(report.coverage, 0.0);
    }
}
