//! Linework noding.
//!
//! Splits a set of segments at every mutual intersection so that the
//! result is a planar linework: segments meet only at shared endpoints.
//! Collinear overlaps are split at the overlap endpoints, which also
//! reconciles boundaries that two producers subdivided differently.
//!
//! Candidate pairs come from an R-tree rather than the quadratic scan,
//! mirroring the boundary-attribution index the rest of the workspace
//! uses for containment lookups.

use std::collections::BTreeMap;

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Coord, Line};
use rstar::{RTree, RTreeObject, AABB};

use crate::segments::{dedup_segments, snap};

#[derive(Clone, Copy)]
struct IndexedLine {
    line: Line<f64>,
    index: usize,
}

impl RTreeObject for IndexedLine {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let (start, end) = (self.line.start, self.line.end);
        AABB::from_corners(
            [start.x.min(end.x), start.y.min(end.y)],
            [start.x.max(end.x), start.y.max(end.y)],
        )
    }
}

/// Nodes a segment set: every output segment intersects the others only
/// at shared endpoints. Output coordinates are snapped to the
/// quantization grid and exact duplicates are removed.
#[must_use]
pub fn node_segments(segments: &[Line<f64>]) -> Vec<Line<f64>> {
    let snapped: Vec<Line<f64>> = segments
        .iter()
        .map(|line| Line::new(snap(line.start), snap(line.end)))
        .collect();

    let indexed: Vec<IndexedLine> = snapped
        .iter()
        .enumerate()
        .map(|(index, line)| IndexedLine { line: *line, index })
        .collect();
    let tree = RTree::bulk_load(indexed);

    // Split points per segment index.
    let mut splits: BTreeMap<usize, Vec<Coord<f64>>> = BTreeMap::new();
    for (a, b) in tree.intersection_candidates_with_other_tree(&tree) {
        // Each unordered pair once; skips self-pairs.
        if a.index >= b.index {
            continue;
        }
        let Some(result) = line_intersection(a.line, b.line) else {
            continue;
        };
        match result {
            LineIntersection::SinglePoint { intersection, .. } => {
                record_split(&mut splits, a, intersection);
                record_split(&mut splits, b, intersection);
            }
            LineIntersection::Collinear { intersection } => {
                for point in [intersection.start, intersection.end] {
                    record_split(&mut splits, a, point);
                    record_split(&mut splits, b, point);
                }
            }
        }
    }

    let mut noded = Vec::with_capacity(snapped.len());
    for (index, segment) in snapped.iter().enumerate() {
        match splits.get(&index) {
            None => noded.push(*segment),
            Some(points) => split_segment(*segment, points, &mut noded),
        }
    }

    dedup_segments(&noded)
}

/// Records a split point if it falls strictly inside the segment.
fn record_split(splits: &mut BTreeMap<usize, Vec<Coord<f64>>>, seg: &IndexedLine, point: Coord<f64>) {
    let point = snap(point);
    if point == snap(seg.line.start) || point == snap(seg.line.end) {
        return;
    }
    splits.entry(seg.index).or_default().push(point);
}

fn split_segment(segment: Line<f64>, points: &[Coord<f64>], out: &mut Vec<Line<f64>>) {
    let start = segment.start;
    let mut ordered = points.to_vec();
    ordered.sort_by(|a, b| {
        let da = (a.x - start.x).powi(2) + (a.y - start.y).powi(2);
        let db = (b.x - start.x).powi(2) + (b.y - start.y).powi(2);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });
    ordered.dedup();

    let mut current = start;
    for point in ordered {
        if point != current {
            out.push(Line::new(current, point));
            current = point;
        }
    }
    if segment.end != current {
        out.push(Line::new(current, segment.end));
    }
}
