//! Quantized segment bookkeeping.
//!
//! Several stages compare geometry coordinate-wise: segment
//! deduplication, dissolve-by-cluster, and the adjacency graphs behind
//! both merge passes. Floating point coordinates produced by different
//! arithmetic paths differ in their last bits, so all comparisons go
//! through a fixed quantization grid of `1e-9` degrees (about 0.1 mm),
//! far below every tolerance the pipeline works at.

use geo::{Coord, Line, LineString, Polygon};

/// Inverse of the quantization step.
const QUANT: f64 = 1e9;

/// Integer key of a coordinate on the quantization grid.
pub type CoordKey = (i64, i64);

/// Normalized (order-independent) key of a segment.
pub type SegmentKey = (CoordKey, CoordKey);

/// Snaps a coordinate onto the quantization grid.
#[must_use]
pub fn snap(coord: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (coord.x * QUANT).round() / QUANT,
        y: (coord.y * QUANT).round() / QUANT,
    }
}

/// Snaps every coordinate of a polygon onto the quantization grid.
#[must_use]
pub fn snap_polygon(polygon: &Polygon<f64>) -> Polygon<f64> {
    let exterior = LineString(polygon.exterior().0.iter().copied().map(snap).collect());
    let interiors = polygon
        .interiors()
        .iter()
        .map(|ring| LineString(ring.0.iter().copied().map(snap).collect()))
        .collect();
    Polygon::new(exterior, interiors)
}

/// Grid key of a coordinate.
#[must_use]
pub fn coord_key(coord: Coord<f64>) -> CoordKey {
    (
        (coord.x * QUANT).round() as i64,
        (coord.y * QUANT).round() as i64,
    )
}

/// Order-independent key of a segment. Returns `None` for segments that
/// collapse to a point on the grid.
#[must_use]
pub fn segment_key(line: &Line<f64>) -> Option<SegmentKey> {
    let start = coord_key(line.start);
    let end = coord_key(line.end);
    if start == end {
        return None;
    }
    Some(if start <= end {
        (start, end)
    } else {
        (end, start)
    })
}

/// All non-degenerate segments of a polygon boundary, exterior and
/// interior rings alike.
#[must_use]
pub fn polygon_segments(polygon: &Polygon<f64>) -> Vec<Line<f64>> {
    let mut segments = Vec::new();
    push_ring_segments(polygon.exterior(), &mut segments);
    for ring in polygon.interiors() {
        push_ring_segments(ring, &mut segments);
    }
    segments
}

fn push_ring_segments(ring: &LineString<f64>, out: &mut Vec<Line<f64>>) {
    for line in ring.lines() {
        if segment_key(&line).is_some() {
            out.push(line);
        }
    }
}

/// Deduplicates segments by normalized key, preserving first-seen order.
#[must_use]
pub fn dedup_segments(segments: &[Line<f64>]) -> Vec<Line<f64>> {
    let mut seen = std::collections::BTreeSet::new();
    let mut unique = Vec::with_capacity(segments.len());
    for line in segments {
        if let Some(key) = segment_key(line) {
            if seen.insert(key) {
                unique.push(*line);
            }
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_aligns_near_identical_coordinates() {
        let a = Coord {
            x: 0.1 + 1e-13,
            y: 0.2 - 1e-13,
        };
        let b = Coord { x: 0.1, y: 0.2 };
        assert_eq!(coord_key(snap(a)), coord_key(b));
    }

    #[test]
    fn segment_key_is_order_independent() {
        let a = Coord { x: 0.0, y: 0.0 };
        let b = Coord { x: 1.0, y: 1.0 };
        assert_eq!(
            segment_key(&Line::new(a, b)),
            segment_key(&Line::new(b, a))
        );
    }

    #[test]
    fn degenerate_segment_has_no_key() {
        let a = Coord { x: 0.5, y: 0.5 };
        assert!(segment_key(&Line::new(a, a)).is_none());
    }

    #[test]
    fn dedup_drops_reversed_duplicates() {
        let a = Coord { x: 0.0, y: 0.0 };
        let b = Coord { x: 1.0, y: 0.0 };
        let c = Coord { x: 1.0, y: 1.0 };
        let segments = vec![Line::new(a, b), Line::new(b, a), Line::new(b, c)];
        assert_eq!(dedup_segments(&segments).len(), 2);
    }
}
