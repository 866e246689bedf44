//! FeatureBind: assigning buildings to sub-polygons.
//!
//! Assigns each building to the region containing its centroid. An
//! R-tree over region bounding boxes narrows the candidate set before
//! the exact containment test. `contains` excludes the boundary, so
//! centroids sitting exactly on a shared edge fall back to an
//! `intersects` test with the lowest region id winning, keeping the
//! assignment deterministic.

use std::collections::BTreeMap;

use geo::{BoundingRect, Contains, Intersects, Point, Polygon};
use rstar::{RTree, RTreeObject, AABB};

/// A region polygon stored in the R-tree with its identifier.
///
/// Multiple entries may share an id when a region is multi-part.
struct RegionEntry {
    id: u32,
    slot: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for RegionEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Point-in-region lookup over a set of identified polygons.
pub struct RegionIndex<'a> {
    regions: Vec<(u32, &'a Polygon<f64>)>,
    tree: RTree<RegionEntry>,
}

impl<'a> RegionIndex<'a> {
    /// Builds the index. Regions with a degenerate bounding box are
    /// skipped.
    #[must_use]
    pub fn new(regions: Vec<(u32, &'a Polygon<f64>)>) -> Self {
        let entries = regions
            .iter()
            .enumerate()
            .filter_map(|(slot, (id, polygon))| {
                polygon.bounding_rect().map(|rect| RegionEntry {
                    id: *id,
                    slot,
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();
        Self {
            regions,
            tree: RTree::bulk_load(entries),
        }
    }

    /// Returns the id of the region containing the point, if any.
    #[must_use]
    pub fn locate(&self, point: Point<f64>) -> Option<u32> {
        let probe = AABB::from_point([point.x(), point.y()]);
        let mut candidates: Vec<&RegionEntry> = self
            .tree
            .locate_in_envelope_intersecting(&probe)
            .collect();
        candidates.sort_by_key(|entry| (entry.id, entry.slot));

        for entry in &candidates {
            if self.regions[entry.slot].1.contains(&point) {
                return Some(entry.id);
            }
        }
        // Boundary case: the point touches an edge shared between
        // regions; the lowest id claims it.
        for entry in &candidates {
            if self.regions[entry.slot].1.intersects(&point) {
                return Some(entry.id);
            }
        }
        None
    }
}

/// Assigns every point to a region id; `None` for points outside all
/// regions.
#[must_use]
pub fn bind_points(index: &RegionIndex<'_>, points: &[Point<f64>]) -> Vec<Option<u32>> {
    points.iter().map(|point| index.locate(*point)).collect()
}

/// Tallies assignments per region id.
#[must_use]
pub fn count_per_region(assignments: &[Option<u32>]) -> BTreeMap<u32, usize> {
    let mut counts = BTreeMap::new();
    for id in assignments.iter().flatten() {
        *counts.entry(*id).or_default() += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn left() -> Polygon<f64> {
        polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 2.0),
            (x: 0.0, y: 2.0),
        ]
    }

    fn right() -> Polygon<f64> {
        polygon![
            (x: 1.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 1.0, y: 2.0),
        ]
    }

    #[test]
    fn binds_interior_points() {
        let (a, b) = (left(), right());
        let index = RegionIndex::new(vec![(1, &a), (2, &b)]);
        assert_eq!(index.locate(Point::new(0.5, 1.0)), Some(1));
        assert_eq!(index.locate(Point::new(1.5, 1.0)), Some(2));
    }

    #[test]
    fn shared_boundary_goes_to_lowest_id() {
        let (a, b) = (left(), right());
        let index = RegionIndex::new(vec![(2, &a), (1, &b)]);
        // On the shared edge x = 1.
        assert_eq!(index.locate(Point::new(1.0, 1.0)), Some(1));
    }

    #[test]
    fn outside_point_is_unassigned() {
        let (a, b) = (left(), right());
        let index = RegionIndex::new(vec![(1, &a), (2, &b)]);
        assert_eq!(index.locate(Point::new(5.0, 5.0)), None);
    }

    #[test]
    fn counts_group_by_region() {
        let (a, b) = (left(), right());
        let index = RegionIndex::new(vec![(1, &a), (2, &b)]);
        let assignments = bind_points(
            &index,
            &[
                Point::new(0.5, 0.5),
                Point::new(0.5, 1.5),
                Point::new(1.5, 0.5),
                Point::new(9.0, 9.0),
            ],
        );
        let counts = count_per_region(&assignments);
        assert_eq!(counts.get(&1), Some(&2));
        assert_eq!(counts.get(&2), Some(&1));
        assert_eq!(counts.len(), 2);
    }
}
