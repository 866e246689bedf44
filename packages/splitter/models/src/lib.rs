#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Data types shared across the fieldtasks splitting pipeline.
//!
//! Defines the splitter configuration, the tag predicate selecting which
//! OSM ways act as task boundaries, and the entities produced by the
//! pipeline stages (`SubPolygon`, `ClusterUid`, `TaskPolygon`, ...).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use geo::{MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};

/// Default desired number of buildings per task.
pub const DEFAULT_TARGET_CLUSTER_SIZE: usize = 10;

/// Default maximum perimeter segment length, in degrees.
///
/// Roughly 4 m at the equator. Chosen to stay above the numeric floor of
/// the Delaunay backend; shorter segments risk vertex-merging during
/// triangulation.
pub const DEFAULT_SEGMENTIZE_DEGREES: f64 = 0.000_04;

/// Default Douglas-Peucker simplification tolerance, in degrees.
///
/// Roughly 7.5 m at the equator.
pub const DEFAULT_SIMPLIFY_DEGREES: f64 = 0.000_075;

/// Which neighbour a low-count region merges into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeRule {
    /// Merge into the neighbour with the most buildings.
    #[default]
    LargestNeighbour,
    /// Merge into the neighbour with the fewest buildings.
    ///
    /// Matches a historical variant of the algorithm; exposed only as an
    /// explicit switch.
    FewestBuildings,
}

/// Tunable parameters for the feature-aware splitting pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Desired number of buildings per task (`T`).
    pub target_cluster_size: usize,
    /// Threshold below which a region merges into a neighbour (`N_min`).
    ///
    /// `None` resolves to `target_cluster_size / 2`.
    pub min_features: Option<usize>,
    /// Maximum perimeter segment length in degrees for densification.
    pub segmentize_degrees: f64,
    /// Douglas-Peucker tolerance in degrees for boundary simplification.
    pub simplify_degrees: f64,
    /// Seed for the deterministic k-means clustering stage.
    pub kmeans_seed: u64,
    /// Neighbour selection rule for the low-count merge stage.
    pub merge_rule: MergeRule,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            target_cluster_size: DEFAULT_TARGET_CLUSTER_SIZE,
            min_features: None,
            segmentize_degrees: DEFAULT_SEGMENTIZE_DEGREES,
            simplify_degrees: DEFAULT_SIMPLIFY_DEGREES,
            kmeans_seed: 0,
            merge_rule: MergeRule::default(),
        }
    }
}

impl SplitConfig {
    /// Resolved low-count threshold: explicit `min_features`, or half the
    /// target cluster size.
    #[must_use]
    pub fn resolved_min_features(&self) -> usize {
        self.min_features
            .unwrap_or(self.target_cluster_size / 2)
    }
}

/// Predicate selecting which linear OSM features split the AOI.
///
/// A way qualifies when its flattened tags contain one of the configured
/// keys and the tag value is not in that key's exclusion set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitTagFilter {
    /// Qualifying tag keys, each with a set of excluded values.
    pub keys: BTreeMap<String, BTreeSet<String>>,
}

impl Default for SplitTagFilter {
    /// Highways except minor classes, plus all waterways and railways.
    fn default() -> Self {
        let mut keys = BTreeMap::new();
        keys.insert(
            "highway".to_string(),
            ["service", "pedestrian", "track", "bus_guideway"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        );
        keys.insert("waterway".to_string(), BTreeSet::new());
        keys.insert("railway".to_string(), BTreeSet::new());
        Self { keys }
    }
}

impl SplitTagFilter {
    /// A filter matching nothing; disables line splitting entirely.
    #[must_use]
    pub fn none() -> Self {
        Self {
            keys: BTreeMap::new(),
        }
    }

    /// Whether the filter can match any way at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether a way with the given flattened tags acts as a splitter.
    #[must_use]
    pub fn matches(&self, tags: &BTreeMap<String, String>) -> bool {
        self.keys.iter().any(|(key, excluded)| {
            tags.get(key)
                .is_some_and(|value| !excluded.contains(value))
        })
    }
}

/// A building footprint retained for clustering.
///
/// The centroid is precomputed once at ingest and reused for every
/// containment test.
#[derive(Debug, Clone)]
pub struct Building {
    /// Footprint polygon in WGS 84.
    pub footprint: Polygon<f64>,
    /// Centroid of the footprint, used for containment tests.
    pub centroid: Point<f64>,
}

/// A region of the AOI bounded by splitter lines and the AOI boundary.
///
/// Starts out single-part; the low-count merge stage can leave a merged
/// region multi-part, so the geometry is a `MultiPolygon`.
#[derive(Debug, Clone)]
pub struct SubPolygon {
    /// Stable identifier assigned in polygonization order.
    pub polyid: u32,
    /// Region geometry in WGS 84.
    pub geometry: MultiPolygon<f64>,
    /// Number of buildings whose centroid falls inside.
    pub feature_count: usize,
    /// Geodesic area in square meters.
    pub area_m2: f64,
}

/// Composite cluster identifier, unique across a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterUid {
    /// The containing `SubPolygon`.
    pub polyid: u32,
    /// Cluster index local to the `SubPolygon`.
    pub cid: u32,
}

impl fmt::Display for ClusterUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.polyid, self.cid)
    }
}

/// A densified perimeter vertex acting as a Voronoi generator.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorSite {
    /// Vertex position in WGS 84.
    pub position: Point<f64>,
    /// Cluster identity inherited by the Voronoi cell.
    pub cluster: ClusterUid,
}

/// One dissolved region per cluster, before boundary simplification.
#[derive(Debug, Clone)]
pub struct PreliminaryTask {
    /// The cluster this region was dissolved from.
    pub cluster: ClusterUid,
    /// Dissolved geometry, tiling the containing `SubPolygon`.
    pub geometry: MultiPolygon<f64>,
}

/// A final task polygon.
#[derive(Debug, Clone)]
pub struct TaskPolygon {
    /// Stable output identifier, dense and ascending.
    pub taskid: u32,
    /// Task geometry in WGS 84.
    pub geometry: MultiPolygon<f64>,
    /// Number of buildings whose centroid the task contains.
    pub building_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn default_filter_keeps_primary_highway() {
        let filter = SplitTagFilter::default();
        assert!(filter.matches(&tags(&[("highway", "primary")])));
    }

    #[test]
    fn default_filter_rejects_excluded_highway_classes() {
        let filter = SplitTagFilter::default();
        for class in ["service", "pedestrian", "track", "bus_guideway"] {
            assert!(!filter.matches(&tags(&[("highway", class)])));
        }
    }

    #[test]
    fn default_filter_keeps_any_waterway_and_railway() {
        let filter = SplitTagFilter::default();
        assert!(filter.matches(&tags(&[("waterway", "river")])));
        assert!(filter.matches(&tags(&[("railway", "rail")])));
    }

    #[test]
    fn default_filter_rejects_untagged_way() {
        let filter = SplitTagFilter::default();
        assert!(!filter.matches(&tags(&[("building", "yes")])));
    }

    #[test]
    fn empty_filter_matches_nothing() {
        let filter = SplitTagFilter::none();
        assert!(filter.is_empty());
        assert!(!filter.matches(&tags(&[("highway", "primary")])));
    }

    #[test]
    fn min_features_defaults_to_half_target() {
        let config = SplitConfig::default();
        assert_eq!(config.resolved_min_features(), 5);
        let config = SplitConfig {
            min_features: Some(3),
            ..SplitConfig::default()
        };
        assert_eq!(config.resolved_min_features(), 3);
    }

    #[test]
    fn cluster_uid_formats_as_composite() {
        let uid = ClusterUid { polyid: 4, cid: 2 };
        assert_eq!(uid.to_string(), "4-2");
    }
}
