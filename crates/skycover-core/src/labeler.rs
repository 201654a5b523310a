//! Semantic role assignment: which cluster is sky, which is ground.
//!
//! Each role is picked by a `RoleRule` that takes the arg-extremum of one
//! named centroid channel. The default sky rule selects the largest mean
//! x-position (the column the reference pipeline reads at flat index 3),
//! not a chroma channel; see DESIGN.md for why this is kept as-is.
use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentError};
use crate::features::FeatureVector;

/// Scalar channels of a FeatureVector a rule may inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureChannel {
    Lightness,
    ChromaA,
    ChromaB,
    X,
    Y,
}

impl FeatureChannel {
    pub fn read(self, v: &FeatureVector) -> f64 {
        match self {
            FeatureChannel::Lightness => v.lightness,
            FeatureChannel::ChromaA => v.chroma_a,
            FeatureChannel::ChromaB => v.chroma_b,
            FeatureChannel::X => v.x,
            FeatureChannel::Y => v.y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extremum {
    Max,
    Min,
}

/// Pick the centroid whose `channel` value is extreme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRule {
    pub channel: FeatureChannel,
    pub extremum: Extremum,
}

impl RoleRule {
    pub const fn new(channel: FeatureChannel, extremum: Extremum) -> Self {
        Self { channel, extremum }
    }

    /// Index of the best centroid not in `exclude`; earliest index wins ties.
    pub fn select(&self, centroids: &[FeatureVector], exclude: Option<usize>) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, c) in centroids.iter().enumerate() {
            if Some(i) == exclude {
                continue;
            }
            let v = self.channel.read(c);
            let better = match (best, self.extremum) {
                (None, _) => true,
                (Some((_, b)), Extremum::Max) => v > b,
                (Some((_, b)), Extremum::Min) => v < b,
            };
            if better {
                best = Some((i, v));
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Default sky rule: rightmost mean x-position.
pub const SKY_RULE: RoleRule = RoleRule::new(FeatureChannel::X, Extremum::Max);
/// Default ground rule: darkest mean lightness.
pub const GROUND_RULE: RoleRule = RoleRule::new(FeatureChannel::Lightness, Extremum::Min);

/// The two distinguished labels. Everything else is a cloud candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticRoles {
    pub sky: usize,
    pub ground: usize,
}

impl SemanticRoles {
    #[inline]
    pub fn is_cloud_candidate(&self, label: usize) -> bool {
        label != self.sky && label != self.ground
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SemanticLabeler {
    pub sky_rule: RoleRule,
    pub ground_rule: RoleRule,
}

impl Default for SemanticLabeler {
    fn default() -> Self {
        Self { sky_rule: SKY_RULE, ground_rule: GROUND_RULE }
    }
}

impl SemanticLabeler {
    /// Stage 4: assign sky and ground.
    ///
    /// Ground is chosen first. If the sky rule lands on the same label, sky
    /// falls to the best remaining label under the sky rule, so the two roles
    /// are always distinct. Needs at least two centroids.
    pub fn assign(&self, centroids: &[FeatureVector]) -> Result<SemanticRoles> {
        if centroids.len() < 2 {
            return Err(SegmentError::clustering(format!(
                "need at least 2 clusters to assign sky and ground, got {}",
                centroids.len()
            )));
        }
        let ground = self
            .ground_rule
            .select(centroids, None)
            .ok_or_else(|| SegmentError::clustering("no centroid for ground"))?;
        let sky = self
            .sky_rule
            .select(centroids, Some(ground))
            .ok_or_else(|| SegmentError::clustering("no centroid for sky"))?;
        Ok(SemanticRoles { sky, ground })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(l: f64, a: f64, x: f64) -> FeatureVector {
        FeatureVector { lightness: l, chroma_a: a, x, ..Default::default() }
    }

    #[test]
    fn default_rules_pick_rightmost_and_darkest() {
        let cents = vec![c(90.0, 0.0, 0.2), c(30.0, 5.0, 0.5), c(70.0, -4.0, 0.6)];
        let roles = SemanticLabeler::default().assign(&cents).unwrap();
        assert_eq!(roles.ground, 1);
        assert_eq!(roles.sky, 2);
        assert!(roles.is_cloud_candidate(0));
        assert!(!roles.is_cloud_candidate(1));
        assert!(!roles.is_cloud_candidate(2));
    }

    #[test]
    fn collision_prefers_ground_and_moves_sky() {
        // Cluster 1 is both darkest and rightmost.
        let cents = vec![c(80.0, 0.0, 0.1), c(20.0, 0.0, 0.9), c(60.0, 0.0, 0.4)];
        let roles = SemanticLabeler::default().assign(&cents).unwrap();
        assert_eq!(roles.ground, 1);
        assert_eq!(roles.sky, 2);
    }

    #[test]
    fn ties_resolve_to_first_index() {
        let cents = vec![c(50.0, 0.0, 0.5); 4];
        let roles = SemanticLabeler::default().assign(&cents).unwrap();
        assert_eq!(roles.ground, 0);
        assert_eq!(roles.sky, 1);
    }

    #[test]
    fn chroma_rule_is_swappable() {
        let labeler = SemanticLabeler {
            sky_rule: RoleRule::new(FeatureChannel::ChromaA, Extremum::Max),
            ..Default::default()
        };
        let cents = vec![c(90.0, 8.0, 0.2), c(30.0, 5.0, 0.5), c(70.0, -4.0, 0.9)];
        let roles = labeler.assign(&cents).unwrap();
        assert_eq!(roles.sky, 0);
    }

    #[test]
    fn single_cluster_is_rejected() {
        let err = SemanticLabeler::default().assign(&[c(1.0, 0.0, 0.0)]).unwrap_err();
        assert!(matches!(err, SegmentError::Clustering { .. }));
    }

    #[test]
    fn rules_deserialize_from_snake_case() {
        let json = r#"{"sky_rule":{"channel":"chroma_b","extremum":"min"},
                       "ground_rule":{"channel":"lightness","extremum":"min"}}"#;
        let labeler: SemanticLabeler = serde_json::from_str(json).unwrap();
        assert_eq!(labeler.sky_rule, RoleRule::new(FeatureChannel::ChromaB, Extremum::Min));
    }
}
